// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BGAPI protocol implementation.
//!
//! The stack is layered bottom-up:
//!
//! - [`SerialPortOpener`]: opens the serial port as an async byte stream
//! - [`FrameDecoder`] and the typed [`Command`], [`Response`] and [`Event`]
//!   messages: the binary wire format
//! - [`SerialHandler`]: owns the stream, decodes frames on a reader task and
//!   serializes writes
//! - [`TransactionManager`]: pairs each command with its response, one at a
//!   time, and fans every frame out to event listeners

mod codec;
mod command;
mod event;
mod response;
mod serial_handler;
mod transaction;
mod transport;

pub use codec::{
    CLASS_ATTCLIENT, CLASS_CONNECTION, CLASS_GAP, CLASS_SYSTEM, Frame, FrameDecoder, HEADER_LEN,
    MAX_PAYLOAD_LEN, MessageId,
};
pub use command::{Command, GapConnectableMode, GapDiscoverMode, GapDiscoverableMode};
pub use event::{ConnectionStatusFlags, Event};
pub use response::{AdapterInfo, Response};
pub use serial_handler::{ClosedObserver, FrameListener, SerialHandler};
pub use transaction::{EventListener, TransactionManager};
#[cfg(feature = "serial")]
pub use transport::TokioSerialOpener;
pub use transport::{BAUD_RATE, SerialPortOpener, SerialStream};
