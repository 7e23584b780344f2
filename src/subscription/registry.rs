// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Listener registration and dispatch.
//!
//! - [`ListenerId`] - Unique identifier for removing a listener
//! - [`ListenerRegistry`] - Ordered, thread-safe list of listeners

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Unique identifier for a registered listener.
///
/// Returned when adding a listener and used to remove it later. IDs are
/// unique within the registry that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Listener({})", self.0)
    }
}

/// Ordered registry of listeners.
///
/// Listeners are invoked in registration order. Dispatch works on a snapshot
/// taken under the read lock, so a listener may add or remove listeners
/// (including itself) while being called.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use bluegiga_lib::subscription::ListenerRegistry;
///
/// let registry: ListenerRegistry<dyn Fn(u8) + Send + Sync> = ListenerRegistry::new();
/// let total = Arc::new(AtomicUsize::new(0));
/// let counter = total.clone();
/// let id = registry.add(Arc::new(move |v: u8| {
///     counter.fetch_add(usize::from(v), Ordering::SeqCst);
/// }));
///
/// registry.for_each(|listener| listener(3));
/// assert_eq!(total.load(Ordering::SeqCst), 3);
///
/// assert!(registry.remove(id));
/// assert!(registry.is_empty());
/// ```
pub struct ListenerRegistry<T: ?Sized> {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Arc<T>)>>,
}

impl<T: ?Sized> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> ListenerRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener and returns its ID.
    pub fn add(&self, listener: Arc<T>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Returns true if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Returns the registered listeners in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    /// Calls `f` for every listener, outside of the registry lock.
    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        for listener in self.snapshot() {
            f(&listener);
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for ListenerRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    type Callback = dyn Fn(&str) + Send + Sync;

    #[test]
    fn dispatches_in_registration_order() {
        let registry: ListenerRegistry<Callback> = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let log = log.clone();
            registry.add(Arc::new(move |msg: &str| {
                log.lock().push(format!("{name}:{msg}"));
            }));
        }

        registry.for_each(|listener| listener("x"));
        assert_eq!(*log.lock(), vec!["first:x", "second:x", "third:x"]);
    }

    #[test]
    fn ids_are_unique() {
        let registry: ListenerRegistry<Callback> = ListenerRegistry::new();
        let a = registry.add(Arc::new(|_: &str| {}));
        let b = registry.add(Arc::new(|_: &str| {}));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn remove_unknown_id_returns_false() {
        let registry: ListenerRegistry<Callback> = ListenerRegistry::new();
        let id = registry.add(Arc::new(|_: &str| {}));
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
    }

    #[test]
    fn listener_can_remove_itself_during_dispatch() {
        let registry: Arc<ListenerRegistry<Callback>> = Arc::new(ListenerRegistry::new());
        let slot = Arc::new(Mutex::new(None));

        let registry_clone = registry.clone();
        let slot_clone = slot.clone();
        let id = registry.add(Arc::new(move |_: &str| {
            if let Some(id) = *slot_clone.lock() {
                registry_clone.remove(id);
            }
        }));
        *slot.lock() = Some(id);

        registry.for_each(|listener| listener("go"));
        assert!(registry.is_empty());
    }

    #[test]
    fn display_format() {
        let registry: ListenerRegistry<Callback> = ListenerRegistry::new();
        let id = registry.add(Arc::new(|_: &str| {}));
        assert_eq!(id.to_string(), "Listener(1)");
        assert_eq!(id.value(), 1);
    }
}
