// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device notifications.

use crate::types::BluetoothAddress;

use super::gatt::{GattCharacteristic, GattService};
use super::state::{CompletionStatus, ConnectionState};

/// Receives notifications from a [`BlueGigaDevice`](super::BlueGigaDevice).
///
/// Every method has an empty default implementation. Notifications are
/// delivered on the serial reader task or a scheduler task, never while the
/// device holds its internal lock, so a listener may call back into the
/// device. Listeners must not block.
///
/// # Examples
///
/// ```
/// use bluegiga_lib::device::{CompletionStatus, DeviceListener, GattCharacteristic};
///
/// struct Printer;
///
/// impl DeviceListener for Printer {
///     fn on_characteristic_read(&self, characteristic: &GattCharacteristic, status: CompletionStatus) {
///         println!("{:#06x}: {:?} {:?}", characteristic.handle, status, characteristic.value);
///     }
/// }
/// ```
pub trait DeviceListener: Send + Sync {
    /// The connection state changed.
    fn on_connection_state_changed(&self, address: BluetoothAddress, state: ConnectionState) {
        let _ = (address, state);
    }

    /// Service and characteristic discovery finished.
    fn on_services_discovered(&self, address: BluetoothAddress, services: &[GattService]) {
        let _ = (address, services);
    }

    /// A characteristic read finished.
    fn on_characteristic_read(&self, characteristic: &GattCharacteristic, status: CompletionStatus) {
        let _ = (characteristic, status);
    }

    /// A characteristic write finished.
    fn on_characteristic_write(
        &self,
        characteristic: &GattCharacteristic,
        status: CompletionStatus,
    ) {
        let _ = (characteristic, status);
    }

    /// A characteristic value arrived, from a read or a notification.
    fn on_characteristic_updated(&self, characteristic: &GattCharacteristic) {
        let _ = characteristic;
    }
}
