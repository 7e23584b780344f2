// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unsolicited BGAPI events.

use uuid::Uuid;

use crate::error::DecodeError;
use crate::types::{BgApiResult, BluetoothAddress, uuid_to_le_bytes};

use super::codec::{
    CLASS_ATTCLIENT, CLASS_CONNECTION, CLASS_GAP, CLASS_SYSTEM, MessageId, WireReader,
    WireWriter, encode_frame,
};
use super::response::AdapterInfo;

/// Flags carried by `connection_status` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConnectionStatusFlags(pub u8);

impl ConnectionStatusFlags {
    /// The link is established.
    pub const CONNECTED: u8 = 0x01;
    /// The link is encrypted.
    pub const ENCRYPTED: u8 = 0x02;
    /// A new connection has completed.
    pub const COMPLETED: u8 = 0x04;
    /// Connection parameters changed.
    pub const PARAMETERS_CHANGE: u8 = 0x08;

    /// Returns true if the link is established.
    #[must_use]
    pub const fn connected(self) -> bool {
        self.0 & Self::CONNECTED != 0
    }

    /// Returns true if the link is encrypted.
    #[must_use]
    pub const fn encrypted(self) -> bool {
        self.0 & Self::ENCRYPTED != 0
    }

    /// Returns true if this status reports a newly completed connection.
    #[must_use]
    pub const fn completed(self) -> bool {
        self.0 & Self::COMPLETED != 0
    }

    /// Returns true if the connection parameters changed.
    #[must_use]
    pub const fn parameters_changed(self) -> bool {
        self.0 & Self::PARAMETERS_CHANGE != 0
    }
}

/// An event emitted by the adapter without a preceding command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `system_boot`: the adapter restarted.
    SystemBoot(AdapterInfo),

    /// `connection_status`: a connection was opened or updated.
    ConnectionStatus {
        /// Connection handle.
        connection: u8,
        /// Status flags.
        flags: ConnectionStatusFlags,
        /// Remote address.
        address: BluetoothAddress,
        /// Remote address type.
        address_type: u8,
        /// Connection interval in 1.25 ms units.
        conn_interval: u16,
        /// Supervision timeout in 10 ms units.
        timeout: u16,
        /// Slave latency.
        latency: u16,
        /// Bonding handle, 0xFF when not bonded.
        bonding: u8,
    },
    /// `connection_disconnected`: a connection was closed.
    ConnectionDisconnected {
        /// Connection handle.
        connection: u8,
        /// Disconnection reason.
        reason: BgApiResult,
    },

    /// `attclient_indicated`: an indication was acknowledged.
    AttClientIndicated {
        /// Connection handle.
        connection: u8,
        /// Attribute handle.
        handle: u16,
    },
    /// `attclient_procedure_completed`: a GATT procedure finished.
    AttClientProcedureCompleted {
        /// Connection handle.
        connection: u8,
        /// Result code.
        result: BgApiResult,
        /// Characteristic handle the procedure operated on.
        handle: u16,
    },
    /// `attclient_group_found`: a primary service was found.
    AttClientGroupFound {
        /// Connection handle.
        connection: u8,
        /// First handle of the service.
        start: u16,
        /// Last handle of the service.
        end: u16,
        /// Service UUID.
        uuid: Uuid,
    },
    /// `attclient_find_information_found`: an attribute was found.
    AttClientFindInformationFound {
        /// Connection handle.
        connection: u8,
        /// Attribute handle.
        handle: u16,
        /// Attribute type UUID.
        uuid: Uuid,
    },
    /// `attclient_attribute_value`: an attribute value was read or notified.
    AttClientAttributeValue {
        /// Connection handle.
        connection: u8,
        /// Attribute handle.
        handle: u16,
        /// Value type (read, notification, indication...).
        value_type: u8,
        /// Attribute value.
        value: Vec<u8>,
    },

    /// `gap_scan_response`: an advertisement or scan response was received.
    GapScanResponse {
        /// RSSI in dBm.
        rssi: i8,
        /// Advertisement packet type.
        packet_type: u8,
        /// Advertiser address.
        sender: BluetoothAddress,
        /// Advertiser address type.
        address_type: u8,
        /// Bond handle, 0xFF when not bonded.
        bond: u8,
        /// Raw advertisement payload.
        data: Vec<u8>,
    },
}

impl Event {
    /// Returns the identifier of the event.
    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        match self {
            Self::SystemBoot(_) => MessageId::new(CLASS_SYSTEM, 0x00),
            Self::ConnectionStatus { .. } => MessageId::new(CLASS_CONNECTION, 0x00),
            Self::ConnectionDisconnected { .. } => MessageId::new(CLASS_CONNECTION, 0x04),
            Self::AttClientIndicated { .. } => MessageId::new(CLASS_ATTCLIENT, 0x00),
            Self::AttClientProcedureCompleted { .. } => MessageId::new(CLASS_ATTCLIENT, 0x01),
            Self::AttClientGroupFound { .. } => MessageId::new(CLASS_ATTCLIENT, 0x02),
            Self::AttClientFindInformationFound { .. } => MessageId::new(CLASS_ATTCLIENT, 0x04),
            Self::AttClientAttributeValue { .. } => MessageId::new(CLASS_ATTCLIENT, 0x05),
            Self::GapScanResponse { .. } => MessageId::new(CLASS_GAP, 0x00),
        }
    }

    /// Returns the connection handle the event refers to, if any.
    #[must_use]
    pub const fn connection(&self) -> Option<u8> {
        match self {
            Self::ConnectionStatus { connection, .. }
            | Self::ConnectionDisconnected { connection, .. }
            | Self::AttClientIndicated { connection, .. }
            | Self::AttClientProcedureCompleted { connection, .. }
            | Self::AttClientGroupFound { connection, .. }
            | Self::AttClientFindInformationFound { connection, .. }
            | Self::AttClientAttributeValue { connection, .. } => Some(*connection),
            Self::SystemBoot(_) | Self::GapScanResponse { .. } => None,
        }
    }

    /// Decodes an event payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnknownMessage`] for identifiers this crate does
    /// not model, [`DecodeError::Truncated`] for short payloads and
    /// [`DecodeError::InvalidUuid`] for UUIDs of unsupported length.
    pub fn decode(id: MessageId, payload: &[u8]) -> Result<Self, DecodeError> {
        let mut r = WireReader::new(id, payload);
        let event = match (id.class, id.id) {
            (CLASS_SYSTEM, 0x00) => Self::SystemBoot(AdapterInfo::read(&mut r)?),
            (CLASS_CONNECTION, 0x00) => Self::ConnectionStatus {
                connection: r.u8()?,
                flags: ConnectionStatusFlags(r.u8()?),
                address: r.address()?,
                address_type: r.u8()?,
                conn_interval: r.u16()?,
                timeout: r.u16()?,
                latency: r.u16()?,
                bonding: r.u8()?,
            },
            (CLASS_CONNECTION, 0x04) => Self::ConnectionDisconnected {
                connection: r.u8()?,
                reason: r.u16()?.into(),
            },
            (CLASS_ATTCLIENT, 0x00) => Self::AttClientIndicated {
                connection: r.u8()?,
                handle: r.u16()?,
            },
            (CLASS_ATTCLIENT, 0x01) => Self::AttClientProcedureCompleted {
                connection: r.u8()?,
                result: r.u16()?.into(),
                handle: r.u16()?,
            },
            (CLASS_ATTCLIENT, 0x02) => Self::AttClientGroupFound {
                connection: r.u8()?,
                start: r.u16()?,
                end: r.u16()?,
                uuid: r.uuid()?,
            },
            (CLASS_ATTCLIENT, 0x04) => Self::AttClientFindInformationFound {
                connection: r.u8()?,
                handle: r.u16()?,
                uuid: r.uuid()?,
            },
            (CLASS_ATTCLIENT, 0x05) => Self::AttClientAttributeValue {
                connection: r.u8()?,
                handle: r.u16()?,
                value_type: r.u8()?,
                value: r.array()?,
            },
            (CLASS_GAP, 0x00) => Self::GapScanResponse {
                rssi: r.i8()?,
                packet_type: r.u8()?,
                sender: r.address()?,
                address_type: r.u8()?,
                bond: r.u8()?,
                data: r.array()?,
            },
            (class, id) => {
                return Err(DecodeError::UnknownMessage {
                    event: true,
                    class,
                    id,
                });
            }
        };
        Ok(event)
    }

    /// Encodes the event payload (without header).
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        match self {
            Self::SystemBoot(info) => info.write(&mut w),
            Self::ConnectionStatus {
                connection,
                flags,
                address,
                address_type,
                conn_interval,
                timeout,
                latency,
                bonding,
            } => {
                w.u8(*connection)
                    .u8(flags.0)
                    .address(address)
                    .u8(*address_type)
                    .u16(*conn_interval)
                    .u16(*timeout)
                    .u16(*latency)
                    .u8(*bonding);
            }
            Self::ConnectionDisconnected { connection, reason } => {
                w.u8(*connection).u16(reason.code());
            }
            Self::AttClientIndicated { connection, handle } => {
                w.u8(*connection).u16(*handle);
            }
            Self::AttClientProcedureCompleted {
                connection,
                result,
                handle,
            } => {
                w.u8(*connection).u16(result.code()).u16(*handle);
            }
            Self::AttClientGroupFound {
                connection,
                start,
                end,
                uuid,
            } => {
                w.u8(*connection)
                    .u16(*start)
                    .u16(*end)
                    .array(&uuid_to_le_bytes(uuid));
            }
            Self::AttClientFindInformationFound {
                connection,
                handle,
                uuid,
            } => {
                w.u8(*connection).u16(*handle).array(&uuid_to_le_bytes(uuid));
            }
            Self::AttClientAttributeValue {
                connection,
                handle,
                value_type,
                value,
            } => {
                w.u8(*connection).u16(*handle).u8(*value_type).array(value);
            }
            Self::GapScanResponse {
                rssi,
                packet_type,
                sender,
                address_type,
                bond,
                data,
            } => {
                w.i8(*rssi)
                    .u8(*packet_type)
                    .address(sender)
                    .u8(*address_type)
                    .u8(*bond)
                    .array(data);
            }
        }
        w.finish()
    }

    /// Encodes the complete frame, as the adapter would send it.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        encode_frame(true, self.message_id(), &self.payload())
    }
}
