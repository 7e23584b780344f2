// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BGAPI responses returned by the adapter.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::types::{BgApiResult, BluetoothAddress};

use super::codec::{
    CLASS_ATTCLIENT, CLASS_CONNECTION, CLASS_GAP, CLASS_SYSTEM, MessageId, WireReader,
    WireWriter, encode_frame,
};

/// Firmware and hardware versions reported by `system_get_info` and the
/// `system_boot` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdapterInfo {
    /// Major software version.
    pub major: u16,
    /// Minor software version.
    pub minor: u16,
    /// Patch version.
    pub patch: u16,
    /// Build number.
    pub build: u16,
    /// Link layer version.
    pub ll_version: u16,
    /// BGAPI protocol version.
    pub protocol_version: u8,
    /// Hardware revision.
    pub hardware: u8,
}

impl AdapterInfo {
    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            major: r.u16()?,
            minor: r.u16()?,
            patch: r.u16()?,
            build: r.u16()?,
            ll_version: r.u16()?,
            protocol_version: r.u8()?,
            hardware: r.u8()?,
        })
    }

    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.u16(self.major)
            .u16(self.minor)
            .u16(self.patch)
            .u16(self.build)
            .u16(self.ll_version)
            .u8(self.protocol_version)
            .u8(self.hardware);
    }

    /// Returns the firmware version as `major.minor.patch.build`.
    #[must_use]
    pub fn version(&self) -> String {
        format!("{}.{}.{}.{}", self.major, self.minor, self.patch, self.build)
    }
}

/// A response to a [`Command`](super::Command).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `system_hello`.
    SystemHello,
    /// `system_address_get`.
    SystemAddressGet {
        /// The local Bluetooth address.
        address: BluetoothAddress,
    },
    /// `system_get_connections`.
    SystemGetConnections {
        /// Number of connection slots supported by the firmware.
        max_connections: u8,
    },
    /// `system_get_info`.
    SystemGetInfo(AdapterInfo),

    /// `connection_disconnect`.
    ConnectionDisconnect {
        /// Connection handle.
        connection: u8,
        /// Result code.
        result: BgApiResult,
    },
    /// `connection_get_rssi`.
    ConnectionGetRssi {
        /// Connection handle.
        connection: u8,
        /// RSSI in dBm.
        rssi: i8,
    },
    /// `connection_update`.
    ConnectionUpdate {
        /// Connection handle.
        connection: u8,
        /// Result code.
        result: BgApiResult,
    },

    /// `attclient_read_by_group_type`.
    AttClientReadByGroupType {
        /// Connection handle.
        connection: u8,
        /// Result code.
        result: BgApiResult,
    },
    /// `attclient_find_information`.
    AttClientFindInformation {
        /// Connection handle.
        connection: u8,
        /// Result code.
        result: BgApiResult,
    },
    /// `attclient_read_by_handle`.
    AttClientReadByHandle {
        /// Connection handle.
        connection: u8,
        /// Result code.
        result: BgApiResult,
    },
    /// `attclient_attribute_write`.
    AttClientAttributeWrite {
        /// Connection handle.
        connection: u8,
        /// Result code.
        result: BgApiResult,
    },
    /// `attclient_write_command`.
    AttClientWriteCommand {
        /// Connection handle.
        connection: u8,
        /// Result code.
        result: BgApiResult,
    },

    /// `gap_set_mode`.
    GapSetMode {
        /// Result code.
        result: BgApiResult,
    },
    /// `gap_discover`.
    GapDiscover {
        /// Result code.
        result: BgApiResult,
    },
    /// `gap_connect_direct`.
    GapConnectDirect {
        /// Result code.
        result: BgApiResult,
        /// Handle reserved for the pending connection.
        connection: u8,
    },
    /// `gap_end_procedure`.
    GapEndProcedure {
        /// Result code.
        result: BgApiResult,
    },
    /// `gap_set_scan_parameters`.
    GapSetScanParameters {
        /// Result code.
        result: BgApiResult,
    },
}

impl Response {
    /// Returns the identifier shared with the originating command.
    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        match self {
            Self::SystemHello => MessageId::new(CLASS_SYSTEM, 0x01),
            Self::SystemAddressGet { .. } => MessageId::new(CLASS_SYSTEM, 0x02),
            Self::SystemGetConnections { .. } => MessageId::new(CLASS_SYSTEM, 0x06),
            Self::SystemGetInfo(_) => MessageId::new(CLASS_SYSTEM, 0x08),
            Self::ConnectionDisconnect { .. } => MessageId::new(CLASS_CONNECTION, 0x00),
            Self::ConnectionGetRssi { .. } => MessageId::new(CLASS_CONNECTION, 0x01),
            Self::ConnectionUpdate { .. } => MessageId::new(CLASS_CONNECTION, 0x02),
            Self::AttClientReadByGroupType { .. } => MessageId::new(CLASS_ATTCLIENT, 0x01),
            Self::AttClientFindInformation { .. } => MessageId::new(CLASS_ATTCLIENT, 0x03),
            Self::AttClientReadByHandle { .. } => MessageId::new(CLASS_ATTCLIENT, 0x04),
            Self::AttClientAttributeWrite { .. } => MessageId::new(CLASS_ATTCLIENT, 0x05),
            Self::AttClientWriteCommand { .. } => MessageId::new(CLASS_ATTCLIENT, 0x06),
            Self::GapSetMode { .. } => MessageId::new(CLASS_GAP, 0x01),
            Self::GapDiscover { .. } => MessageId::new(CLASS_GAP, 0x02),
            Self::GapConnectDirect { .. } => MessageId::new(CLASS_GAP, 0x03),
            Self::GapEndProcedure { .. } => MessageId::new(CLASS_GAP, 0x04),
            Self::GapSetScanParameters { .. } => MessageId::new(CLASS_GAP, 0x07),
        }
    }

    /// Returns the result code, for responses that carry one.
    #[must_use]
    pub const fn result(&self) -> Option<BgApiResult> {
        match self {
            Self::ConnectionDisconnect { result, .. }
            | Self::ConnectionUpdate { result, .. }
            | Self::AttClientReadByGroupType { result, .. }
            | Self::AttClientFindInformation { result, .. }
            | Self::AttClientReadByHandle { result, .. }
            | Self::AttClientAttributeWrite { result, .. }
            | Self::AttClientWriteCommand { result, .. }
            | Self::GapSetMode { result }
            | Self::GapDiscover { result }
            | Self::GapConnectDirect { result, .. }
            | Self::GapEndProcedure { result }
            | Self::GapSetScanParameters { result } => Some(*result),
            Self::SystemHello
            | Self::SystemAddressGet { .. }
            | Self::SystemGetConnections { .. }
            | Self::SystemGetInfo(_)
            | Self::ConnectionGetRssi { .. } => None,
        }
    }

    /// Returns true unless the response carries a failure result code.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result().is_none_or(|result| result.is_success())
    }

    /// Decodes a response payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnknownMessage`] for identifiers this crate does
    /// not model and [`DecodeError::Truncated`] for short payloads.
    pub fn decode(id: MessageId, payload: &[u8]) -> Result<Self, DecodeError> {
        let mut r = WireReader::new(id, payload);
        let response = match (id.class, id.id) {
            (CLASS_SYSTEM, 0x01) => Self::SystemHello,
            (CLASS_SYSTEM, 0x02) => Self::SystemAddressGet {
                address: r.address()?,
            },
            (CLASS_SYSTEM, 0x06) => Self::SystemGetConnections {
                max_connections: r.u8()?,
            },
            (CLASS_SYSTEM, 0x08) => Self::SystemGetInfo(AdapterInfo::read(&mut r)?),
            (CLASS_CONNECTION, 0x00) => Self::ConnectionDisconnect {
                connection: r.u8()?,
                result: r.u16()?.into(),
            },
            (CLASS_CONNECTION, 0x01) => Self::ConnectionGetRssi {
                connection: r.u8()?,
                rssi: r.i8()?,
            },
            (CLASS_CONNECTION, 0x02) => Self::ConnectionUpdate {
                connection: r.u8()?,
                result: r.u16()?.into(),
            },
            (CLASS_ATTCLIENT, 0x01) => Self::AttClientReadByGroupType {
                connection: r.u8()?,
                result: r.u16()?.into(),
            },
            (CLASS_ATTCLIENT, 0x03) => Self::AttClientFindInformation {
                connection: r.u8()?,
                result: r.u16()?.into(),
            },
            (CLASS_ATTCLIENT, 0x04) => Self::AttClientReadByHandle {
                connection: r.u8()?,
                result: r.u16()?.into(),
            },
            (CLASS_ATTCLIENT, 0x05) => Self::AttClientAttributeWrite {
                connection: r.u8()?,
                result: r.u16()?.into(),
            },
            (CLASS_ATTCLIENT, 0x06) => Self::AttClientWriteCommand {
                connection: r.u8()?,
                result: r.u16()?.into(),
            },
            (CLASS_GAP, 0x01) => Self::GapSetMode {
                result: r.u16()?.into(),
            },
            (CLASS_GAP, 0x02) => Self::GapDiscover {
                result: r.u16()?.into(),
            },
            (CLASS_GAP, 0x03) => Self::GapConnectDirect {
                result: r.u16()?.into(),
                connection: r.u8()?,
            },
            (CLASS_GAP, 0x04) => Self::GapEndProcedure {
                result: r.u16()?.into(),
            },
            (CLASS_GAP, 0x07) => Self::GapSetScanParameters {
                result: r.u16()?.into(),
            },
            (class, id) => {
                return Err(DecodeError::UnknownMessage {
                    event: false,
                    class,
                    id,
                });
            }
        };
        Ok(response)
    }

    /// Encodes the response payload (without header).
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        match self {
            Self::SystemHello => {}
            Self::SystemAddressGet { address } => {
                w.address(address);
            }
            Self::SystemGetConnections { max_connections } => {
                w.u8(*max_connections);
            }
            Self::SystemGetInfo(info) => info.write(&mut w),
            Self::ConnectionDisconnect { connection, result }
            | Self::ConnectionUpdate { connection, result }
            | Self::AttClientReadByGroupType { connection, result }
            | Self::AttClientFindInformation { connection, result }
            | Self::AttClientReadByHandle { connection, result }
            | Self::AttClientAttributeWrite { connection, result }
            | Self::AttClientWriteCommand { connection, result } => {
                w.u8(*connection).u16(result.code());
            }
            Self::ConnectionGetRssi { connection, rssi } => {
                w.u8(*connection).i8(*rssi);
            }
            Self::GapSetMode { result }
            | Self::GapDiscover { result }
            | Self::GapEndProcedure { result }
            | Self::GapSetScanParameters { result } => {
                w.u16(result.code());
            }
            Self::GapConnectDirect { result, connection } => {
                w.u16(result.code()).u8(*connection);
            }
        }
        w.finish()
    }

    /// Encodes the complete frame, as the adapter would send it.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        encode_frame(false, self.message_id(), &self.payload())
    }
}
