// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The BlueGiga adapter and its configuration.
//!
//! The [`BlueGigaAdapter`] owns the serial link to the dongle. It tracks the
//! connection slots, scans passively when idle and routes events to the
//! [`BlueGigaDevice`](crate::BlueGigaDevice) they concern.

mod bluegiga_adapter;
mod config;
mod discovery;
mod status;

pub use crate::protocol::AdapterInfo;
pub(crate) use bluegiga_adapter::AdapterInner;
pub use bluegiga_adapter::BlueGigaAdapter;
pub use config::AdapterConfig;
pub use discovery::{DiscoveredDevice, DiscoverySink};
pub use status::AdapterStatus;
