// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adapter status.

use std::fmt;

/// Lifecycle status of the adapter.
///
/// ```text
/// Uninitialized -> Initializing -> Online
///                       ^            |
///                       |            v
///                       +------- Offline
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum AdapterStatus {
    /// [`initialize`](crate::BlueGigaAdapter::initialize) has not been called.
    #[default]
    Uninitialized,
    /// The port is being opened and the adapter brought to a known state.
    Initializing,
    /// The adapter is ready for commands.
    Online,
    /// Initialization failed or the link was lost.
    Offline(String),
}

impl AdapterStatus {
    /// Returns true if the adapter is online.
    #[must_use]
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for AdapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Initializing => write!(f, "initializing"),
            Self::Online => write!(f, "online"),
            Self::Offline(reason) => write!(f, "offline ({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(AdapterStatus::Online.to_string(), "online");
        assert_eq!(
            AdapterStatus::Offline("port busy".to_string()).to_string(),
            "offline (port busy)"
        );
    }

    #[test]
    fn default_is_uninitialized() {
        assert_eq!(AdapterStatus::default(), AdapterStatus::Uninitialized);
        assert!(!AdapterStatus::default().is_online());
    }
}
