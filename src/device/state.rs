// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state enums.

use std::fmt;

/// Connection state of a remote device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Known by address but not yet seen advertising.
    #[default]
    Discovering,
    /// Seen advertising at least once.
    Discovered,
    /// A connect request is outstanding.
    Connecting,
    /// Connected.
    Connected,
    /// The connection was closed or the connect attempt failed.
    Disconnected,
}

impl ConnectionState {
    /// Returns true if the device is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Discovering => "DISCOVERING",
            Self::Discovered => "DISCOVERED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Disconnected => "DISCONNECTED",
        };
        f.write_str(name)
    }
}

/// GATT procedure occupying a device's connection.
///
/// At most one procedure is outstanding per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Procedure {
    /// No procedure in progress.
    #[default]
    None,
    /// Enumerating primary services.
    GetServices,
    /// Enumerating characteristics and descriptors.
    GetCharacteristics,
    /// Reading a characteristic.
    CharacteristicRead,
    /// Writing a characteristic.
    CharacteristicWrite,
}

impl Procedure {
    /// Returns true if no procedure is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::GetServices => "GET_SERVICES",
            Self::GetCharacteristics => "GET_CHARACTERISTICS",
            Self::CharacteristicRead => "CHARACTERISTIC_READ",
            Self::CharacteristicWrite => "CHARACTERISTIC_WRITE",
        };
        f.write_str(name)
    }
}

/// Outcome of a characteristic read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionStatus {
    /// The operation succeeded.
    Success,
    /// The operation failed.
    Error,
}

/// How a characteristic is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WriteType {
    /// Acknowledged write (`attclient_attribute_write`).
    #[default]
    WithResponse,
    /// Unacknowledged write (`attclient_write_command`).
    WithoutResponse,
}
