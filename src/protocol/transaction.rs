// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command/response pairing on top of a [`SerialHandler`].
//!
//! The adapter processes one command at a time, so the manager allows a
//! single transaction in flight: concurrent callers queue on an internal
//! async mutex and run strictly one after another. Every frame, response or
//! event, is also fanned out to the registered event listeners before the
//! pending transaction is resolved.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::ProtocolError;
use crate::subscription::{ListenerId, ListenerRegistry};

use super::codec::{Frame, MessageId};
use super::command::Command;
use super::response::Response;
use super::serial_handler::{FrameListener, SerialHandler};

/// Callback receiving every frame seen by the transaction manager.
pub type EventListener = FrameListener;

struct Pending {
    expected: MessageId,
    sender: oneshot::Sender<Response>,
}

struct Inner {
    serial: SerialHandler,
    frame_listener: Mutex<Option<ListenerId>>,
    listeners: ListenerRegistry<EventListener>,
    pending: Mutex<Option<Pending>>,
    exclusive: tokio::sync::Mutex<()>,
    closed: AtomicBool,
}

impl Inner {
    fn on_frame(&self, frame: &Frame) {
        self.listeners.for_each(|listener| listener(frame));

        let Frame::Response(response) = frame else {
            return;
        };

        let mut pending = self.pending.lock();
        match pending.take() {
            Some(p) if p.expected == response.message_id() => {
                if p.sender.send(response.clone()).is_err() {
                    tracing::debug!(id = %p.expected, "Transaction abandoned before its response");
                }
            }
            other => {
                tracing::debug!(id = %response.message_id(), "Ignoring unsolicited response");
                *pending = other;
            }
        }
    }
}

/// Sends commands and waits for their responses.
///
/// Cloning the manager is cheap; all clones share the same transaction slot.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use bluegiga_lib::protocol::{Command, Response, SerialHandler, TransactionManager};
///
/// # async fn example(serial: SerialHandler) -> Result<(), bluegiga_lib::ProtocolError> {
/// let manager = TransactionManager::new(serial);
/// let response = manager
///     .send_transaction(&Command::SystemGetConnections, Duration::from_secs(5))
///     .await?;
/// if let Response::SystemGetConnections { max_connections } = response {
///     println!("{max_connections} connection slots");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TransactionManager {
    inner: Arc<Inner>,
}

impl TransactionManager {
    /// Creates a manager listening to `serial`.
    #[must_use]
    pub fn new(serial: SerialHandler) -> Self {
        let inner = Arc::new(Inner {
            serial,
            frame_listener: Mutex::new(None),
            listeners: ListenerRegistry::new(),
            pending: Mutex::new(None),
            exclusive: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&inner);
        let id = inner.serial.add_frame_listener(Arc::new(move |frame: &Frame| {
            if let Some(inner) = weak.upgrade() {
                inner.on_frame(frame);
            }
        }));
        *inner.frame_listener.lock() = Some(id);

        Self { inner }
    }

    /// Returns the serial handler this manager writes to.
    #[must_use]
    pub fn serial(&self) -> &SerialHandler {
        &self.inner.serial
    }

    /// Adds a listener receiving every frame, in arrival order.
    pub fn add_event_listener(&self, listener: Arc<EventListener>) -> ListenerId {
        self.inner.listeners.add(listener)
    }

    /// Removes an event listener.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Returns true once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Writes `command` and waits for the response with the same identifier.
    ///
    /// Responses with other identifiers are ignored while waiting; events
    /// keep flowing to the listeners.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Timeout`] if no matching response arrives in
    /// time, [`ProtocolError::ChannelClosed`] if the manager or the link is
    /// closed, or [`ProtocolError::Io`] if the write fails.
    pub async fn send_transaction(
        &self,
        command: &Command,
        timeout: Duration,
    ) -> Result<Response, ProtocolError> {
        let _exclusive = self.inner.exclusive.lock().await;
        let expected = command.message_id();
        let (sender, receiver) = oneshot::channel();
        {
            // close() clears the slot after setting the flag
            let mut pending = self.inner.pending.lock();
            if self.is_closed() {
                return Err(ProtocolError::ChannelClosed(
                    "transaction manager closed".to_string(),
                ));
            }
            *pending = Some(Pending { expected, sender });
        }

        tracing::debug!(command = command.name(), id = %expected, "Sending command");
        if let Err(e) = self.inner.serial.write(&command.encode()).await {
            self.inner.pending.lock().take();
            return Err(e);
        }

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(response)) => {
                tracing::trace!(command = command.name(), ?response, "Response received");
                Ok(response)
            }
            Ok(Err(_)) => Err(ProtocolError::ChannelClosed(
                "transaction manager closed".to_string(),
            )),
            Err(_) => {
                self.inner.pending.lock().take();
                let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(command = command.name(), timeout_ms = ms, "Command timed out");
                Err(ProtocolError::Timeout(ms))
            }
        }
    }

    /// Writes a command that the adapter never answers, such as
    /// `system_reset`.
    ///
    /// Waits for any transaction in flight to finish first.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ChannelClosed`] if the manager or the link is
    /// closed, or [`ProtocolError::Io`] if the write fails.
    pub async fn send(&self, command: &Command) -> Result<(), ProtocolError> {
        let _exclusive = self.inner.exclusive.lock().await;
        if self.is_closed() {
            return Err(ProtocolError::ChannelClosed(
                "transaction manager closed".to_string(),
            ));
        }
        tracing::debug!(command = command.name(), "Sending command without response");
        self.inner.serial.write(&command.encode()).await
    }

    /// Detaches from the serial handler and fails any pending transaction.
    ///
    /// Idempotent. The serial handler itself stays open.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(id) = self.inner.frame_listener.lock().take() {
            self.inner.serial.remove_frame_listener(id);
        }
        self.inner.pending.lock().take();
        self.inner.listeners.clear();
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("port", &self.inner.serial.port())
            .field("closed", &self.is_closed())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}
