// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversions between Bluetooth UUID encodings and [`Uuid`].
//!
//! BGAPI carries UUIDs as little-endian byte arrays of 2, 4 or 16 bytes.
//! Short forms are expanded onto the Bluetooth base UUID
//! `00000000-0000-1000-8000-00805F9B34FB`.

use uuid::Uuid;

/// The Bluetooth base UUID with a zero short value.
const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

/// Primary service declaration, used to enumerate services.
pub const PRIMARY_SERVICE: u16 = 0x2800;
/// Secondary service declaration.
pub const SECONDARY_SERVICE: u16 = 0x2801;
/// Include declaration.
pub const INCLUDE: u16 = 0x2802;
/// Characteristic declaration.
pub const CHARACTERISTIC: u16 = 0x2803;

/// Expands a 16-bit Bluetooth UUID to its 128-bit form.
///
/// # Examples
///
/// ```
/// use bluegiga_lib::types::uuid_from_u16;
///
/// assert_eq!(
///     uuid_from_u16(0x180F).to_string(),
///     "0000180f-0000-1000-8000-00805f9b34fb"
/// );
/// ```
#[must_use]
pub fn uuid_from_u16(short: u16) -> Uuid {
    uuid_from_u32(u32::from(short))
}

/// Expands a 32-bit Bluetooth UUID to its 128-bit form.
#[must_use]
pub fn uuid_from_u32(short: u32) -> Uuid {
    Uuid::from_u128(BASE_UUID | (u128::from(short) << 96))
}

/// Returns the 16-bit short form if the UUID lies on the Bluetooth base.
#[must_use]
pub fn short_uuid(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    let short = value >> 96;
    if value & ((1u128 << 96) - 1) == BASE_UUID && short <= u128::from(u16::MAX) {
        u16::try_from(short).ok()
    } else {
        None
    }
}

/// Decodes a little-endian BGAPI UUID of 2, 4 or 16 bytes.
#[must_use]
pub fn uuid_from_le_bytes(bytes: &[u8]) -> Option<Uuid> {
    match bytes.len() {
        2 => Some(uuid_from_u16(u16::from_le_bytes([bytes[0], bytes[1]]))),
        4 => Some(uuid_from_u32(u32::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ]))),
        16 => {
            let mut buf = [0u8; 16];
            buf.copy_from_slice(bytes);
            Some(Uuid::from_u128(u128::from_le_bytes(buf)))
        }
        _ => None,
    }
}

/// Encodes a UUID in the shortest little-endian BGAPI form.
#[must_use]
pub fn uuid_to_le_bytes(uuid: &Uuid) -> Vec<u8> {
    match short_uuid(uuid) {
        Some(short) => short.to_le_bytes().to_vec(),
        None => uuid.as_u128().to_le_bytes().to_vec(),
    }
}
