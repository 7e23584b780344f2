// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event bus for broadcasting adapter events.

use tokio::sync::broadcast;

use super::AdapterEvent;

/// Default channel capacity for the event bus.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Event bus for broadcasting adapter events to multiple subscribers.
///
/// The `EventBus` uses tokio's broadcast channel, so every subscriber gets
/// its own copy of each event.
///
/// # Capacity
///
/// The event bus has a fixed capacity (default 256). A subscriber that falls
/// behind loses the oldest events and receives `RecvError::Lagged`.
///
/// # Examples
///
/// ```
/// use bluegiga_lib::adapter::AdapterStatus;
/// use bluegiga_lib::event::{AdapterEvent, EventBus};
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
///
/// bus.publish(AdapterEvent::StatusChanged(AdapterStatus::Online));
/// assert_eq!(
///     rx.try_recv().unwrap(),
///     AdapterEvent::StatusChanged(AdapterStatus::Online)
/// );
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AdapterEvent>,
}

impl EventBus {
    /// Creates a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a new event bus with the specified capacity.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events that can be buffered
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to adapter events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AdapterEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event to all subscribers.
    ///
    /// Without subscribers the event is discarded.
    pub fn publish(&self, event: AdapterEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterStatus;
    use crate::types::BluetoothAddress;

    #[test]
    fn subscriber_count_follows_receivers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        let rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(rx1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn publish_delivers_to_multiple_subscribers() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let address: BluetoothAddress = "00:07:80:AB:CD:EF".parse().unwrap();
        bus.publish(AdapterEvent::DeviceAdded { address });

        assert_eq!(rx1.recv().await.unwrap().address(), Some(address));
        assert_eq!(rx2.recv().await.unwrap().address(), Some(address));
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(AdapterEvent::StatusChanged(AdapterStatus::Uninitialized));
    }

    #[test]
    fn clone_shares_same_channel() {
        let bus1 = EventBus::new();
        let bus2 = bus1.clone();
        let mut rx = bus1.subscribe();

        bus2.publish(AdapterEvent::StatusChanged(AdapterStatus::Online));
        assert!(rx.try_recv().is_ok());
    }
}
