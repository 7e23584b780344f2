// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adapter lifecycle events.

use crate::adapter::AdapterStatus;
use crate::types::BluetoothAddress;

/// Events published by a [`BlueGigaAdapter`](crate::BlueGigaAdapter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterEvent {
    /// The adapter status changed.
    StatusChanged(AdapterStatus),

    /// A device was added to the registry.
    DeviceAdded {
        /// The device address.
        address: BluetoothAddress,
    },

    /// A device was evicted from the registry.
    DeviceRemoved {
        /// The device address.
        address: BluetoothAddress,
    },
}

impl AdapterEvent {
    /// Returns the device address for device events.
    #[must_use]
    pub fn address(&self) -> Option<BluetoothAddress> {
        match self {
            Self::DeviceAdded { address } | Self::DeviceRemoved { address } => Some(*address),
            Self::StatusChanged(_) => None,
        }
    }

    /// Returns true if this is a status change.
    #[must_use]
    pub fn is_status_change(&self) -> bool {
        matches!(self, Self::StatusChanged(_))
    }
}
