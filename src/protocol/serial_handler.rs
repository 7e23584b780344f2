// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serial link handler.
//!
//! Owns the byte stream to the adapter. A background task reads the stream,
//! decodes frames and hands each one to the registered frame listeners, in
//! registration order, on the reader task. Writes go through an async mutex
//! so concurrent writers never interleave frames.
//!
//! When the stream fails or ends, on either the read or the write side, the
//! handler marks itself closed, stops the reader and calls the closed
//! observer once with the reason. An explicit [`close`] never calls the
//! observer.
//!
//! [`close`]: SerialHandler::close

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

use crate::error::ProtocolError;
use crate::subscription::{ListenerId, ListenerRegistry};

use super::codec::{Frame, FrameDecoder};
use super::transport::SerialStream;

const READ_BUFFER_SIZE: usize = 256;

/// Callback receiving every decoded frame.
pub type FrameListener = dyn Fn(&Frame) + Send + Sync;

/// Callback receiving the reason the link was lost.
pub type ClosedObserver = Box<dyn FnOnce(String) + Send>;

type Writer = WriteHalf<Box<dyn SerialStream>>;

struct Inner {
    port: String,
    writer: tokio::sync::Mutex<Option<Writer>>,
    listeners: ListenerRegistry<FrameListener>,
    closed_observer: Mutex<Option<ClosedObserver>>,
    closed: AtomicBool,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    /// Marks the link lost and notifies the observer, once.
    fn lose(&self, reason: String) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        tracing::warn!(port = %self.port, reason = %reason, "Serial link lost");
        if let Some(task) = self.reader.lock().take() {
            task.abort();
        }
        let observer = self.closed_observer.lock().take();
        if let Some(observer) = observer {
            observer(reason);
        }
    }
}

/// Handle to an open serial link.
///
/// Cloning the handle is cheap; all clones share the same link.
#[derive(Clone)]
pub struct SerialHandler {
    inner: Arc<Inner>,
}

impl SerialHandler {
    /// Takes ownership of `stream` and starts the reader task.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(port: impl Into<String>, stream: Box<dyn SerialStream>) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        let inner = Arc::new(Inner {
            port: port.into(),
            writer: tokio::sync::Mutex::new(Some(writer)),
            listeners: ListenerRegistry::new(),
            closed_observer: Mutex::new(None),
            closed: AtomicBool::new(false),
            reader: Mutex::new(None),
        });

        let task = tokio::spawn(read_loop(reader, Arc::downgrade(&inner)));
        *inner.reader.lock() = Some(task);

        tracing::debug!(port = %inner.port, "Serial handler started");
        Self { inner }
    }

    /// Returns the name of the port this handler was opened on.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.inner.port
    }

    /// Returns true once the link has been closed or lost.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Adds a listener for decoded frames.
    pub fn add_frame_listener(&self, listener: Arc<FrameListener>) -> ListenerId {
        self.inner.listeners.add(listener)
    }

    /// Removes a frame listener.
    pub fn remove_frame_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Sets the observer notified when the link is lost.
    ///
    /// Replaces any previously set observer.
    pub fn set_closed_observer(&self, observer: ClosedObserver) {
        *self.inner.closed_observer.lock() = Some(observer);
    }

    /// Writes a complete frame to the link.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ChannelClosed`] if the link is closed, or
    /// [`ProtocolError::Io`] if the write fails. A failed write loses the
    /// link.
    pub async fn write(&self, bytes: &[u8]) -> Result<(), ProtocolError> {
        let mut guard = self.inner.writer.lock().await;
        let writer = match guard.as_mut() {
            Some(writer) if !self.is_closed() => writer,
            _ => return Err(ProtocolError::ChannelClosed(self.inner.port.clone())),
        };

        tracing::trace!(port = %self.inner.port, bytes = ?bytes, "TX");
        let result = match writer.write_all(bytes).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };
        drop(guard);

        if let Err(e) = result {
            self.inner.lose(e.to_string());
            return Err(e.into());
        }
        Ok(())
    }

    /// Closes the link and stops the reader task.
    ///
    /// Idempotent. Does not notify the closed observer.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(task) = self.inner.reader.lock().take() {
            task.abort();
        }
        self.inner.closed_observer.lock().take();
        self.inner.listeners.clear();
        if let Ok(mut writer) = self.inner.writer.try_lock() {
            writer.take();
        }
        tracing::debug!(port = %self.inner.port, "Serial handler closed");
    }
}

impl std::fmt::Debug for SerialHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialHandler")
            .field("port", &self.inner.port)
            .field("closed", &self.is_closed())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

async fn read_loop(mut reader: ReadHalf<Box<dyn SerialStream>>, inner: Weak<Inner>) {
    let mut decoder = FrameDecoder::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];

    let reason = loop {
        match reader.read(&mut buf).await {
            Ok(0) => break "end of stream".to_string(),
            Ok(n) => {
                tracing::trace!(bytes = ?&buf[..n], "RX");
                decoder.push(&buf[..n]);
                let Some(inner) = inner.upgrade() else {
                    return;
                };
                dispatch_frames(&mut decoder, &inner);
            }
            Err(e) => break e.to_string(),
        }
    };

    if let Some(inner) = inner.upgrade() {
        inner.lose(reason);
    }
}

fn dispatch_frames(decoder: &mut FrameDecoder, inner: &Inner) {
    loop {
        match decoder.decode() {
            Ok(Some(frame)) => {
                tracing::trace!(id = %frame.message_id(), "Frame received");
                inner.listeners.for_each(|listener| listener(&frame));
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(port = %inner.port, error = %e, "Dropping undecodable frame");
            }
        }
    }
}
