// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BGAPI commands sent from the host to the adapter.

use uuid::Uuid;

use crate::types::{AddressType, BluetoothAddress, uuid_to_le_bytes};

use super::codec::{
    CLASS_ATTCLIENT, CLASS_CONNECTION, CLASS_GAP, CLASS_SYSTEM, MessageId, WireWriter,
    encode_frame,
};

/// GAP discoverable mode used by `gap_set_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GapDiscoverableMode {
    /// Not discoverable.
    NonDiscoverable = 0,
    /// Discoverable for a limited period.
    LimitedDiscoverable = 1,
    /// Discoverable using general discovery.
    GeneralDiscoverable = 2,
    /// Broadcast only.
    Broadcast = 3,
    /// User supplied advertisement data.
    UserData = 4,
}

/// GAP connectable mode used by `gap_set_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GapConnectableMode {
    /// Not connectable.
    NonConnectable = 0,
    /// Directed connectable.
    DirectedConnectable = 1,
    /// Undirected connectable.
    UndirectedConnectable = 2,
    /// Scannable but not connectable.
    ScannableNonConnectable = 3,
}

/// GAP discovery mode used by `gap_discover`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GapDiscoverMode {
    /// Only devices in limited discoverable mode.
    Limited = 0,
    /// Devices in limited or general discoverable mode.
    Generic = 1,
    /// Every advertising device.
    Observation = 2,
}

/// A BGAPI command.
///
/// Each command encodes to exactly one frame; the adapter answers with a
/// response carrying the same [`MessageId`].
///
/// # Examples
///
/// ```
/// use bluegiga_lib::protocol::Command;
///
/// let bytes = Command::ConnectionDisconnect { connection: 2 }.encode();
/// assert_eq!(bytes, vec![0x00, 0x01, 0x03, 0x00, 0x02]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `system_reset`: reboots the adapter. No response is sent; the adapter
    /// announces itself with a `system_boot` event.
    SystemReset {
        /// Reboot into the DFU bootloader instead of the application.
        boot_in_dfu: bool,
    },
    /// `system_hello`: checks the link.
    SystemHello,
    /// `system_address_get`: reads the local Bluetooth address.
    SystemAddressGet,
    /// `system_get_connections`: reads the number of connection slots.
    SystemGetConnections,
    /// `system_get_info`: reads firmware and hardware versions.
    SystemGetInfo,

    /// `connection_disconnect`: closes a connection.
    ConnectionDisconnect {
        /// Connection handle.
        connection: u8,
    },
    /// `connection_get_rssi`: reads the RSSI of a connection.
    ConnectionGetRssi {
        /// Connection handle.
        connection: u8,
    },
    /// `connection_update`: requests new connection parameters.
    ConnectionUpdate {
        /// Connection handle.
        connection: u8,
        /// Minimum connection interval (1.25 ms units).
        interval_min: u16,
        /// Maximum connection interval (1.25 ms units).
        interval_max: u16,
        /// Slave latency in connection events.
        latency: u16,
        /// Supervision timeout (10 ms units).
        timeout: u16,
    },

    /// `attclient_read_by_group_type`: enumerates attribute groups (services).
    AttClientReadByGroupType {
        /// Connection handle.
        connection: u8,
        /// First attribute handle.
        start: u16,
        /// Last attribute handle.
        end: u16,
        /// Group type UUID.
        uuid: Uuid,
    },
    /// `attclient_find_information`: enumerates attribute handles and types.
    AttClientFindInformation {
        /// Connection handle.
        connection: u8,
        /// First attribute handle.
        start: u16,
        /// Last attribute handle.
        end: u16,
    },
    /// `attclient_read_by_handle`: reads an attribute value.
    AttClientReadByHandle {
        /// Connection handle.
        connection: u8,
        /// Attribute handle.
        handle: u16,
    },
    /// `attclient_attribute_write`: writes an attribute and waits for the acknowledgement.
    AttClientAttributeWrite {
        /// Connection handle.
        connection: u8,
        /// Attribute handle.
        handle: u16,
        /// Value to write.
        data: Vec<u8>,
    },
    /// `attclient_write_command`: writes an attribute without acknowledgement.
    AttClientWriteCommand {
        /// Connection handle.
        connection: u8,
        /// Attribute handle.
        handle: u16,
        /// Value to write.
        data: Vec<u8>,
    },

    /// `gap_set_mode`: sets discoverability and connectability.
    GapSetMode {
        /// Discoverable mode.
        discover: GapDiscoverableMode,
        /// Connectable mode.
        connect: GapConnectableMode,
    },
    /// `gap_discover`: starts scanning.
    GapDiscover {
        /// Discovery mode.
        mode: GapDiscoverMode,
    },
    /// `gap_connect_direct`: connects to a specific device.
    GapConnectDirect {
        /// Remote device address.
        address: BluetoothAddress,
        /// Remote address type.
        address_type: AddressType,
        /// Minimum connection interval (1.25 ms units).
        interval_min: u16,
        /// Maximum connection interval (1.25 ms units).
        interval_max: u16,
        /// Supervision timeout (10 ms units).
        timeout: u16,
        /// Slave latency in connection events.
        latency: u16,
    },
    /// `gap_end_procedure`: stops the current GAP procedure (scanning, connecting).
    GapEndProcedure,
    /// `gap_set_scan_parameters`: configures scanning.
    GapSetScanParameters {
        /// Scan interval (0.625 ms units).
        interval: u16,
        /// Scan window (0.625 ms units).
        window: u16,
        /// Whether to send scan requests.
        active: bool,
    },
}

impl Command {
    /// Returns the identifier shared by the command and its response.
    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        match self {
            Self::SystemReset { .. } => MessageId::new(CLASS_SYSTEM, 0x00),
            Self::SystemHello => MessageId::new(CLASS_SYSTEM, 0x01),
            Self::SystemAddressGet => MessageId::new(CLASS_SYSTEM, 0x02),
            Self::SystemGetConnections => MessageId::new(CLASS_SYSTEM, 0x06),
            Self::SystemGetInfo => MessageId::new(CLASS_SYSTEM, 0x08),
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
            Self::GapEndProcedure => MessageId::new(CLASS_GAP, 0x04),
            Self::GapSetScanParameters { .. } => MessageId::new(CLASS_GAP, 0x07),
        }
    }

    /// Returns the BGAPI name of the command, for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SystemReset { .. } => "system_reset",
            Self::SystemHello => "system_hello",
            Self::SystemAddressGet => "system_address_get",
            Self::SystemGetConnections => "system_get_connections",
            Self::SystemGetInfo => "system_get_info",
            Self::ConnectionDisconnect { .. } => "connection_disconnect",
            Self::ConnectionGetRssi { .. } => "connection_get_rssi",
            Self::ConnectionUpdate { .. } => "connection_update",
            Self::AttClientReadByGroupType { .. } => "attclient_read_by_group_type",
            Self::AttClientFindInformation { .. } => "attclient_find_information",
            Self::AttClientReadByHandle { .. } => "attclient_read_by_handle",
            Self::AttClientAttributeWrite { .. } => "attclient_attribute_write",
            Self::AttClientWriteCommand { .. } => "attclient_write_command",
            Self::GapSetMode { .. } => "gap_set_mode",
            Self::GapDiscover { .. } => "gap_discover",
            Self::GapConnectDirect { .. } => "gap_connect_direct",
            Self::GapEndProcedure => "gap_end_procedure",
            Self::GapSetScanParameters { .. } => "gap_set_scan_parameters",
        }
    }

    /// Returns false for commands the adapter never answers.
    #[must_use]
    pub const fn expects_response(&self) -> bool {
        !matches!(self, Self::SystemReset { .. })
    }

    /// Encodes the command payload (without header).
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        match self {
            Self::SystemHello
            | Self::SystemAddressGet
            | Self::SystemGetConnections
            | Self::SystemGetInfo
            | Self::GapEndProcedure => {}
            Self::SystemReset { boot_in_dfu } => {
                w.u8(u8::from(*boot_in_dfu));
            }
            Self::ConnectionDisconnect { connection } | Self::ConnectionGetRssi { connection } => {
                w.u8(*connection);
            }
            Self::ConnectionUpdate {
                connection,
                interval_min,
                interval_max,
                latency,
                timeout,
            } => {
                w.u8(*connection)
                    .u16(*interval_min)
                    .u16(*interval_max)
                    .u16(*latency)
                    .u16(*timeout);
            }
            Self::AttClientReadByGroupType {
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
            Self::AttClientFindInformation {
                connection,
                start,
                end,
            } => {
                w.u8(*connection).u16(*start).u16(*end);
            }
            Self::AttClientReadByHandle { connection, handle } => {
                w.u8(*connection).u16(*handle);
            }
            Self::AttClientAttributeWrite {
                connection,
                handle,
                data,
            }
            | Self::AttClientWriteCommand {
                connection,
                handle,
                data,
            } => {
                w.u8(*connection).u16(*handle).array(data);
            }
            Self::GapSetMode { discover, connect } => {
                w.u8(*discover as u8).u8(*connect as u8);
            }
            Self::GapDiscover { mode } => {
                w.u8(*mode as u8);
            }
            Self::GapConnectDirect {
                address,
                address_type,
                interval_min,
                interval_max,
                timeout,
                latency,
            } => {
                w.address(address)
                    .u8(address_type.as_wire())
                    .u16(*interval_min)
                    .u16(*interval_max)
                    .u16(*timeout)
                    .u16(*latency);
            }
            Self::GapSetScanParameters {
                interval,
                window,
                active,
            } => {
                w.u16(*interval).u16(*window).u8(u8::from(*active));
            }
        }
        w.finish()
    }

    /// Encodes the complete frame for transmission.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        encode_frame(false, self.message_id(), &self.payload())
    }
}
