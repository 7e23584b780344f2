// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serial port access.
//!
//! The adapter never opens a port directly; it asks a [`SerialPortOpener`]
//! for a byte stream. The `serial` feature provides [`TokioSerialOpener`]
//! for real hardware, tests provide in-memory streams.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::TransportError;

/// Baud rate used by BlueGiga dongles.
pub const BAUD_RATE: u32 = 115_200;

/// A bidirectional byte stream to the adapter.
pub trait SerialStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> SerialStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Opens serial ports by name.
pub trait SerialPortOpener: Send + Sync {
    /// Opens `port` at `baud_rate` with 8 data bits, no parity, one stop bit
    /// and no flow control.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Open`] if the port cannot be opened.
    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn SerialStream>, TransportError>;
}

/// Opens ports through `tokio-serial`.
#[cfg(feature = "serial")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSerialOpener;

#[cfg(feature = "serial")]
impl SerialPortOpener for TokioSerialOpener {
    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn SerialStream>, TransportError> {
        use tokio_serial::SerialPortBuilderExt;

        let stream = tokio_serial::new(port, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TransportError::Open {
                port: port.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!(port, baud_rate, "Serial port opened");
        Ok(Box::new(stream))
    }
}
