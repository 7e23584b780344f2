// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Remote Bluetooth devices.
//!
//! Each [`BlueGigaDevice`] tracks two orthogonal pieces of state:
//!
//! - its [`ConnectionState`]: `DISCOVERING -> DISCOVERED`, then
//!   `CONNECTING -> CONNECTED -> DISCONNECTED` for every connection
//! - the GATT [`Procedure`] occupying its connection: service discovery,
//!   characteristic discovery, a read or a write
//!
//! Only one procedure runs at a time. Every procedure ends in
//! [`Procedure::None`]: on completion, on disconnection or when its timeout
//! fires. A timed out procedure is abandoned without a completion
//! notification.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use bluegiga_lib::device::{CompletionStatus, DeviceListener, GattCharacteristic};
//! use bluegiga_lib::BlueGigaAdapter;
//!
//! struct Battery;
//!
//! impl DeviceListener for Battery {
//!     fn on_characteristic_read(&self, c: &GattCharacteristic, status: CompletionStatus) {
//!         if status == CompletionStatus::Success {
//!             println!("battery level {:?}", c.value.first());
//!         }
//!     }
//! }
//!
//! # async fn example(adapter: BlueGigaAdapter) {
//! let device = adapter.get_device("00:07:80:12:34:56".parse().unwrap());
//! device.add_listener(Arc::new(Battery));
//! if device.connect().await {
//!     // wait for CONNECTED, then
//!     device.read_characteristic(0x0012).await;
//! }
//! # }
//! ```

mod bluegiga_device;
mod gatt;
mod listener;
mod state;

pub use bluegiga_device::BlueGigaDevice;
pub use gatt::{GattCharacteristic, GattDescriptor, GattService};
pub use listener::DeviceListener;
pub use state::{CompletionStatus, ConnectionState, Procedure, WriteType};
