// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bluetooth device addresses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A 48-bit Bluetooth device address.
///
/// Bytes are stored in display order (most significant first), so
/// `AA:BB:CC:DD:EE:FF` has `bytes()[0] == 0xAA`. BGAPI transmits addresses
/// least significant byte first; use [`from_wire`](Self::from_wire) and
/// [`to_wire`](Self::to_wire) to convert.
///
/// # Examples
///
/// ```
/// use bluegiga_lib::types::BluetoothAddress;
///
/// let address: BluetoothAddress = "00:07:80:12:34:56".parse().unwrap();
/// assert_eq!(address.to_wire(), [0x56, 0x34, 0x12, 0x80, 0x07, 0x00]);
/// assert_eq!(address.to_string(), "00:07:80:12:34:56");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BluetoothAddress([u8; 6]);

impl BluetoothAddress {
    /// Creates an address from bytes in display order.
    #[must_use]
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Creates an address from the little-endian byte order used on the wire.
    #[must_use]
    pub fn from_wire(mut bytes: [u8; 6]) -> Self {
        bytes.reverse();
        Self(bytes)
    }

    /// Returns the address in the little-endian byte order used on the wire.
    #[must_use]
    pub fn to_wire(&self) -> [u8; 6] {
        let mut bytes = self.0;
        bytes.reverse();
        bytes
    }

    /// Returns the address bytes in display order.
    #[must_use]
    pub const fn bytes(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for BluetoothAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for BluetoothAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split([':', '-']);
        for byte in &mut bytes {
            let part = parts.next().ok_or(ConfigError::InvalidAddress(s.to_string()))?;
            if part.len() != 2 {
                return Err(ConfigError::InvalidAddress(s.to_string()));
            }
            *byte = u8::from_str_radix(part, 16)
                .map_err(|_| ConfigError::InvalidAddress(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(ConfigError::InvalidAddress(s.to_string()));
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for BluetoothAddress {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BluetoothAddress> for String {
    fn from(address: BluetoothAddress) -> Self {
        address.to_string()
    }
}

/// The type of a Bluetooth device address as reported by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AddressType {
    /// A public (IEEE assigned) address.
    Public,
    /// A random (static or private) address.
    Random,
    /// The type has not been observed yet.
    #[default]
    Unknown,
}

impl AddressType {
    /// Returns the BGAPI wire value.
    ///
    /// `Unknown` is sent as public, which is what the adapter assumes when
    /// connecting to a device it has not scanned.
    #[must_use]
    pub const fn as_wire(&self) -> u8 {
        match self {
            Self::Public | Self::Unknown => 0,
            Self::Random => 1,
        }
    }

    /// Parses the BGAPI wire value.
    #[must_use]
    pub const fn from_wire(value: u8) -> Self {
        match value {
            0 => Self::Public,
            1 => Self::Random,
            _ => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let address: BluetoothAddress = "a0:b1:c2:d3:e4:f5".parse().unwrap();
        assert_eq!(address.bytes(), [0xA0, 0xB1, 0xC2, 0xD3, 0xE4, 0xF5]);
        assert_eq!(address.to_string(), "A0:B1:C2:D3:E4:F5");
    }

    #[test]
    fn parse_accepts_dashes() {
        let address: BluetoothAddress = "00-11-22-33-44-55".parse().unwrap();
        assert_eq!(address, BluetoothAddress::new([0, 0x11, 0x22, 0x33, 0x44, 0x55]));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("00:11:22:33:44".parse::<BluetoothAddress>().is_err());
        assert!("00:11:22:33:44:55:66".parse::<BluetoothAddress>().is_err());
        assert!("00:11:22:33:44:GG".parse::<BluetoothAddress>().is_err());
        assert!("0:11:22:33:44:55".parse::<BluetoothAddress>().is_err());
    }

    #[test]
    fn wire_order_is_reversed() {
        let address = BluetoothAddress::from_wire([1, 2, 3, 4, 5, 6]);
        assert_eq!(address.to_string(), "06:05:04:03:02:01");
        assert_eq!(address.to_wire(), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn address_type_wire_values() {
        assert_eq!(AddressType::from_wire(0), AddressType::Public);
        assert_eq!(AddressType::from_wire(1), AddressType::Random);
        assert_eq!(AddressType::from_wire(7), AddressType::Unknown);
        assert_eq!(AddressType::Unknown.as_wire(), 0);
        assert_eq!(AddressType::Random.as_wire(), 1);
    }
}
