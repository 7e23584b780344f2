// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsing of advertisement and scan response payloads.
//!
//! The payload is a sequence of EIR records, each `[length, type, data...]`
//! where `length` covers the type byte and the data. A zero length ends the
//! payload early. Malformed trailing records are ignored.

use std::collections::HashMap;

use uuid::Uuid;

use super::gatt_uuid::{uuid_from_le_bytes, uuid_from_u16};

const EIR_FLAGS: u8 = 0x01;
const EIR_UUID16_INCOMPLETE: u8 = 0x02;
const EIR_UUID16_COMPLETE: u8 = 0x03;
const EIR_UUID32_INCOMPLETE: u8 = 0x04;
const EIR_UUID32_COMPLETE: u8 = 0x05;
const EIR_UUID128_INCOMPLETE: u8 = 0x06;
const EIR_UUID128_COMPLETE: u8 = 0x07;
const EIR_NAME_SHORT: u8 = 0x08;
const EIR_NAME_LONG: u8 = 0x09;
const EIR_TX_POWER: u8 = 0x0A;
const EIR_SERVICE_DATA_UUID16: u8 = 0x16;
const EIR_MANUFACTURER_SPECIFIC: u8 = 0xFF;

/// Records extracted from a single advertisement payload.
///
/// # Examples
///
/// ```
/// use bluegiga_lib::types::AdvertisementData;
///
/// let payload = [
///     0x02, 0x01, 0x06, // flags
///     0x05, 0x09, b'T', b'a', b'g', b'1', // complete name
///     0x05, 0xFF, 0x4C, 0x00, 0x02, 0x15, // manufacturer data
/// ];
/// let data = AdvertisementData::parse(&payload);
/// assert_eq!(data.name.as_deref(), Some("Tag1"));
/// assert_eq!(data.manufacturer_id, Some(0x004C));
/// assert_eq!(data.manufacturer_data, Some(vec![0x02, 0x15]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisementData {
    /// Advertising flags.
    pub flags: Option<u8>,
    /// Local name; a complete name wins over a shortened one.
    pub name: Option<String>,
    /// Advertised transmit power in dBm.
    pub tx_power: Option<i8>,
    /// Company identifier from the manufacturer specific record.
    pub manufacturer_id: Option<u16>,
    /// Manufacturer specific data following the company identifier.
    pub manufacturer_data: Option<Vec<u8>>,
    /// Advertised service UUIDs.
    pub service_uuids: Vec<Uuid>,
    /// Service data keyed by 16-bit service UUID.
    pub service_data: HashMap<Uuid, Vec<u8>>,
}

impl AdvertisementData {
    /// Parses an advertisement payload.
    #[must_use]
    pub fn parse(payload: &[u8]) -> Self {
        let mut data = Self::default();
        let mut short_name = None;
        let mut offset = 0;

        while offset < payload.len() {
            let length = usize::from(payload[offset]);
            if length == 0 || offset + 1 + length > payload.len() {
                break;
            }
            let record_type = payload[offset + 1];
            let body = &payload[offset + 2..offset + 1 + length];
            offset += 1 + length;

            match record_type {
                EIR_FLAGS => data.flags = body.first().copied(),
                EIR_UUID16_INCOMPLETE | EIR_UUID16_COMPLETE => {
                    data.service_uuids
                        .extend(body.chunks_exact(2).filter_map(uuid_from_le_bytes));
                }
                EIR_UUID32_INCOMPLETE | EIR_UUID32_COMPLETE => {
                    data.service_uuids
                        .extend(body.chunks_exact(4).filter_map(uuid_from_le_bytes));
                }
                EIR_UUID128_INCOMPLETE | EIR_UUID128_COMPLETE => {
                    data.service_uuids
                        .extend(body.chunks_exact(16).filter_map(uuid_from_le_bytes));
                }
                EIR_NAME_SHORT => short_name = Some(String::from_utf8_lossy(body).into_owned()),
                EIR_NAME_LONG => data.name = Some(String::from_utf8_lossy(body).into_owned()),
                EIR_TX_POWER => data.tx_power = body.first().map(|b| i8::from_le_bytes([*b])),
                EIR_SERVICE_DATA_UUID16 if body.len() >= 2 => {
                    let uuid = uuid_from_u16(u16::from_le_bytes([body[0], body[1]]));
                    data.service_data.insert(uuid, body[2..].to_vec());
                }
                EIR_MANUFACTURER_SPECIFIC if body.len() >= 2 => {
                    data.manufacturer_id = Some(u16::from_le_bytes([body[0], body[1]]));
                    data.manufacturer_data = Some(body[2..].to_vec());
                }
                other => {
                    tracing::trace!(record_type = other, len = body.len(), "Ignoring EIR record");
                }
            }
        }

        if data.name.is_none() {
            data.name = short_name;
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tx_power_and_uuids() {
        let payload = [
            0x02, 0x0A, 0xF4, // tx power -12
            0x05, 0x03, 0x0F, 0x18, 0x0A, 0x18, // battery + device information
        ];
        let data = AdvertisementData::parse(&payload);
        assert_eq!(data.tx_power, Some(-12));
        assert_eq!(
            data.service_uuids,
            vec![uuid_from_u16(0x180F), uuid_from_u16(0x180A)]
        );
    }

    #[test]
    fn complete_name_wins_over_short_name() {
        let payload = [
            0x03, 0x09, b'L', b'o', // complete
            0x02, 0x08, b'S', // short
        ];
        let data = AdvertisementData::parse(&payload);
        assert_eq!(data.name.as_deref(), Some("Lo"));
    }

    #[test]
    fn short_name_used_when_alone() {
        let data = AdvertisementData::parse(&[0x03, 0x08, b'a', b'b']);
        assert_eq!(data.name.as_deref(), Some("ab"));
    }

    #[test]
    fn service_data_is_keyed_by_uuid() {
        let data = AdvertisementData::parse(&[0x05, 0x16, 0x1A, 0x18, 0x01, 0x02]);
        assert_eq!(
            data.service_data.get(&uuid_from_u16(0x181A)),
            Some(&vec![0x01, 0x02])
        );
    }

    #[test]
    fn truncated_record_stops_parsing() {
        let payload = [0x02, 0x01, 0x06, 0x09, 0x09, b'x'];
        let data = AdvertisementData::parse(&payload);
        assert_eq!(data.flags, Some(0x06));
        assert_eq!(data.name, None);
    }

    #[test]
    fn zero_length_terminates() {
        let payload = [0x00, 0x02, 0x01, 0x06];
        assert_eq!(AdvertisementData::parse(&payload), AdvertisementData::default());
    }
}
