// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discovery reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AddressType, BluetoothAddress};

/// Snapshot of a discovered device handed to [`DiscoverySink`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    /// Device address.
    pub address: BluetoothAddress,
    /// Address type reported by the last advertisement.
    pub address_type: AddressType,
    /// Advertised name.
    pub name: Option<String>,
    /// Last received signal strength in dBm.
    pub rssi: Option<i8>,
    /// Advertised transmit power in dBm.
    pub tx_power: Option<i8>,
    /// Company identifier from the manufacturer specific data.
    pub manufacturer_id: Option<u16>,
    /// Wall clock time of the last advertisement.
    pub last_seen: DateTime<Utc>,
}

/// Receives discovery reports from the adapter.
///
/// Called on the serial reader task or a scheduler task; implementations
/// must return quickly and must not block.
pub trait DiscoverySink: Send + Sync {
    /// A device was discovered, or re-announced by a refresh.
    fn device_discovered(&self, device: &DiscoveredDevice);
}

impl<F> DiscoverySink for F
where
    F: Fn(&DiscoveredDevice) + Send + Sync,
{
    fn device_discovered(&self, device: &DiscoveredDevice) {
        self(device);
    }
}
