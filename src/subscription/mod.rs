// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Listener registries used across the stack.
//!
//! The serial handler, the transaction manager, the adapter and every device
//! keep their observers in a [`ListenerRegistry`]. Adding a listener returns
//! a [`ListenerId`] which removes it again:
//!
//! ```
//! use std::sync::Arc;
//! use bluegiga_lib::subscription::ListenerRegistry;
//!
//! let registry: ListenerRegistry<dyn Fn(&str) + Send + Sync> = ListenerRegistry::new();
//! let id = registry.add(Arc::new(|msg: &str| println!("{msg}")));
//! registry.for_each(|listener| listener("hello"));
//! registry.remove(id);
//! ```

mod registry;

pub use registry::{ListenerId, ListenerRegistry};
