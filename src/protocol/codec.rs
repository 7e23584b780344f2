// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BGAPI frame codec.
//!
//! Every BGAPI message starts with a four byte header:
//!
//! | Byte | Bits | Meaning |
//! |------|------|---------|
//! | 0 | 7 | message type: 0 = command/response, 1 = event |
//! | 0 | 6..3 | technology type: 0 = Bluetooth Smart |
//! | 0 | 2..0 | payload length, bits 10..8 |
//! | 1 | 7..0 | payload length, bits 7..0 |
//! | 2 | | class id |
//! | 3 | | command or event id |
//!
//! The payload follows. Integers are little-endian, Bluetooth addresses are
//! six bytes least significant first, and variable-length blocks carry a
//! one byte length prefix.

use std::fmt;

use crate::error::DecodeError;
use crate::types::{BluetoothAddress, uuid_from_le_bytes};

use super::{Event, Response};

/// Length of the BGAPI header.
pub const HEADER_LEN: usize = 4;

/// Largest payload the 11-bit length field can describe.
pub const MAX_PAYLOAD_LEN: usize = 0x07FF;

const EVENT_FLAG: u8 = 0x80;
const TECHNOLOGY_MASK: u8 = 0x78;
const LENGTH_HIGH_MASK: u8 = 0x07;

/// The system class (adapter information and control).
pub const CLASS_SYSTEM: u8 = 0x00;
/// The connection class.
pub const CLASS_CONNECTION: u8 = 0x03;
/// The attribute client (GATT client) class.
pub const CLASS_ATTCLIENT: u8 = 0x04;
/// The generic access profile class.
pub const CLASS_GAP: u8 = 0x06;

/// Identifies a BGAPI message by class and message id.
///
/// A response shares the identifier of the command it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId {
    /// The class identifier.
    pub class: u8,
    /// The message identifier within the class.
    pub id: u8,
}

impl MessageId {
    /// Creates a message identifier.
    #[must_use]
    pub const fn new(class: u8, id: u8) -> Self {
        Self { class, id }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}/0x{:02X}", self.class, self.id)
    }
}

/// A decoded BGAPI message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A response to a previously sent command.
    Response(Response),
    /// An unsolicited event.
    Event(Event),
}

impl Frame {
    /// Returns the message identifier of the frame.
    #[must_use]
    pub fn message_id(&self) -> MessageId {
        match self {
            Self::Response(response) => response.message_id(),
            Self::Event(event) => event.message_id(),
        }
    }

    /// Returns the wire encoding of the frame.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Response(response) => response.encode(),
            Self::Event(event) => event.encode(),
        }
    }
}

/// Builds a complete frame from a message identifier and payload.
///
/// Payloads longer than [`MAX_PAYLOAD_LEN`] are truncated; no BGAPI message
/// comes close to the limit.
pub(crate) fn encode_frame(event: bool, id: MessageId, payload: &[u8]) -> Vec<u8> {
    let payload = &payload[..payload.len().min(MAX_PAYLOAD_LEN)];
    let len = payload.len();
    let mut frame = Vec::with_capacity(HEADER_LEN + len);
    let type_bit = if event { EVENT_FLAG } else { 0 };
    #[allow(clippy::cast_possible_truncation)]
    {
        frame.push(type_bit | ((len >> 8) as u8 & LENGTH_HIGH_MASK));
        frame.push((len & 0xFF) as u8);
    }
    frame.push(id.class);
    frame.push(id.id);
    frame.extend_from_slice(payload);
    frame
}

/// Serializes payload fields in BGAPI order.
#[derive(Debug, Default)]
pub(crate) struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub(crate) fn i8(&mut self, value: i8) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn address(&mut self, address: &BluetoothAddress) -> &mut Self {
        self.buf.extend_from_slice(&address.to_wire());
        self
    }

    /// Writes a length-prefixed byte block, truncated to 255 bytes.
    pub(crate) fn array(&mut self, data: &[u8]) -> &mut Self {
        let data = &data[..data.len().min(usize::from(u8::MAX))];
        #[allow(clippy::cast_possible_truncation)]
        self.buf.push(data.len() as u8);
        self.buf.extend_from_slice(data);
        self
    }

    pub(crate) fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

/// Reads payload fields in BGAPI order, reporting truncation.
pub(crate) struct WireReader<'a> {
    id: MessageId,
    payload: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub(crate) fn new(id: MessageId, payload: &'a [u8]) -> Self {
        Self { id, payload, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let available = self.payload.len() - self.pos;
        if available < n {
            return Err(DecodeError::Truncated {
                class: self.id.class,
                id: self.id.id,
                needed: n,
                available,
            });
        }
        let slice = &self.payload[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn i8(&mut self) -> Result<i8, DecodeError> {
        Ok(i8::from_le_bytes([self.u8()?]))
    }

    pub(crate) fn u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn address(&mut self) -> Result<BluetoothAddress, DecodeError> {
        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(self.take(6)?);
        Ok(BluetoothAddress::from_wire(bytes))
    }

    pub(crate) fn array(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = usize::from(self.u8()?);
        Ok(self.take(len)?.to_vec())
    }

    pub(crate) fn uuid(&mut self) -> Result<uuid::Uuid, DecodeError> {
        let bytes = self.array()?;
        uuid_from_le_bytes(&bytes).ok_or(DecodeError::InvalidUuid {
            class: self.id.class,
            id: self.id.id,
            length: bytes.len(),
        })
    }
}

/// Incremental decoder turning a byte stream into [`Frame`]s.
///
/// Bytes are appended with [`push`](Self::push); [`decode`](Self::decode)
/// returns `Ok(None)` until a complete frame is buffered. The decoder never
/// blocks and a decoding error never poisons the stream: the offending bytes
/// have already been consumed when the error is returned.
///
/// # Examples
///
/// ```
/// use bluegiga_lib::protocol::{Frame, FrameDecoder, Response};
///
/// let mut decoder = FrameDecoder::new();
/// // system_get_connections response: max connections = 3
/// decoder.push(&[0x00, 0x01, 0x00]);
/// assert_eq!(decoder.decode().unwrap(), None);
///
/// decoder.push(&[0x06, 0x03]);
/// let frame = decoder.decode().unwrap();
/// assert_eq!(
///     frame,
///     Some(Frame::Response(Response::SystemGetConnections { max_connections: 3 }))
/// );
/// ```
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends received bytes to the internal buffer.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Returns the number of buffered, not yet decoded bytes.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Discards all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Decodes the next frame from the buffer.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the next message is malformed or not
    /// known. An invalid header drops a single byte so the decoder can
    /// resynchronize; any other error drops the whole frame.
    pub fn decode(&mut self) -> Result<Option<Frame>, DecodeError> {
        if self.buffer.len() < HEADER_LEN {
            return Ok(None);
        }

        let header = self.buffer[0];
        if header & TECHNOLOGY_MASK != 0 {
            self.buffer.remove(0);
            return Err(DecodeError::InvalidHeader(header));
        }

        let len = (usize::from(header & LENGTH_HIGH_MASK) << 8) | usize::from(self.buffer[1]);
        if self.buffer.len() < HEADER_LEN + len {
            return Ok(None);
        }

        let frame: Vec<u8> = self.buffer.drain(..HEADER_LEN + len).collect();
        let id = MessageId::new(frame[2], frame[3]);
        let payload = &frame[HEADER_LEN..];

        if header & EVENT_FLAG == 0 {
            Response::decode(id, payload).map(|r| Some(Frame::Response(r)))
        } else {
            Event::decode(id, payload).map(|e| Some(Frame::Event(e)))
        }
    }
}
