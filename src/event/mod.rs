// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adapter event stream.
//!
//! The adapter publishes status changes and device registry changes on an
//! [`EventBus`]. Subscribers receive [`AdapterEvent`]s through a tokio
//! broadcast receiver:
//!
//! ```no_run
//! use bluegiga_lib::event::AdapterEvent;
//!
//! # async fn example(adapter: bluegiga_lib::BlueGigaAdapter) {
//! let mut events = adapter.subscribe();
//! while let Ok(event) = events.recv().await {
//!     if let AdapterEvent::DeviceAdded { address } = event {
//!         println!("new device {address}");
//!     }
//! }
//! # }
//! ```

mod adapter_event;
mod event_bus;

pub use adapter_event::AdapterEvent;
pub use event_bus::EventBus;
