// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `BlueGiga` Lib - Bluetooth Low Energy over BlueGiga BGAPI dongles.
//!
//! This library drives BLED112-style USB dongles through their BGAPI serial
//! protocol, with async APIs built on tokio.
//!
//! # Layers
//!
//! - **Frame codec** ([`protocol`]): BGAPI packet framing, commands,
//!   responses and events
//! - **Serial transport** ([`protocol::SerialHandler`]): reads frames off the
//!   port and writes commands to it
//! - **Transactions** ([`protocol::TransactionManager`]): one command in
//!   flight at a time, matched to its response
//! - **Adapter** ([`BlueGigaAdapter`]): initialization, scanning, connection
//!   slots and device registry
//! - **Devices** ([`BlueGigaDevice`]): connection and GATT procedure state
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use bluegiga_lib::adapter::{AdapterConfig, DiscoveredDevice};
//! use bluegiga_lib::BlueGigaAdapter;
//!
//! #[tokio::main]
//! async fn main() -> bluegiga_lib::Result<()> {
//!     let config = AdapterConfig::new("/dev/ttyACM0").with_discovery_enabled(true);
//!     let adapter = BlueGigaAdapter::with_serial_port(config);
//!
//!     adapter.add_discovery_sink(Arc::new(|device: &DiscoveredDevice| {
//!         println!("{} rssi={:?} name={:?}", device.address, device.rssi, device.name);
//!     }));
//!
//!     // Retries until the dongle is plugged in
//!     adapter.initialize();
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!     adapter.dispose().await;
//!     Ok(())
//! }
//! ```
//!
//! # Events
//!
//! ```no_run
//! use bluegiga_lib::event::AdapterEvent;
//! # async fn example(adapter: bluegiga_lib::BlueGigaAdapter) {
//! let mut events = adapter.subscribe();
//! while let Ok(event) = events.recv().await {
//!     match event {
//!         AdapterEvent::StatusChanged(status) => println!("adapter {status}"),
//!         AdapterEvent::DeviceAdded { address } => println!("new device {address}"),
//!         AdapterEvent::DeviceRemoved { address } => println!("gone {address}"),
//!     }
//! }
//! # }
//! ```

pub mod adapter;
pub mod device;
pub mod error;
pub mod event;
pub mod protocol;
mod scheduler;
pub mod subscription;
pub mod types;

pub use adapter::{AdapterConfig, AdapterStatus, BlueGigaAdapter, DiscoveredDevice, DiscoverySink};
pub use device::{
    BlueGigaDevice, CompletionStatus, ConnectionState, DeviceListener, GattCharacteristic,
    GattService, Procedure, WriteType,
};
pub use error::{ConfigError, DecodeError, Error, ProtocolError, Result, TransportError};
pub use event::{AdapterEvent, EventBus};
pub use scheduler::{ScheduledTask, Scheduler};
pub use subscription::ListenerId;
pub use types::{AddressType, BgApiResult, BluetoothAddress};
