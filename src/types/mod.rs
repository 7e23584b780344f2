// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by the protocol, adapter and device layers.
//!
//! - [`BluetoothAddress`] and [`AddressType`]: device identity
//! - [`BgApiResult`]: result codes reported by the adapter firmware
//! - UUID helpers for 16/32/128-bit Bluetooth UUIDs
//! - [`AdvertisementData`]: parsed advertisement records

mod address;
mod advertisement;
mod gatt_uuid;
mod result;

pub use address::{AddressType, BluetoothAddress};
pub use advertisement::AdvertisementData;
pub use gatt_uuid::{
    CHARACTERISTIC, INCLUDE, PRIMARY_SERVICE, SECONDARY_SERVICE, short_uuid, uuid_from_le_bytes,
    uuid_from_u16, uuid_from_u32, uuid_to_le_bytes,
};
pub use result::BgApiResult;
