// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the BlueGiga library.
//!
//! This module provides the error hierarchy used across the crate: serial
//! transport failures, BGAPI protocol failures (timeouts, closed links,
//! mismatched responses), frame decoding failures and configuration
//! validation.

use thiserror::Error;

use crate::protocol::MessageId;
use crate::types::BgApiResult;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred while talking BGAPI to the adapter.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred on the serial link.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The adapter configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The adapter reported a non-success result code.
    #[error("command failed: {0}")]
    Command(BgApiResult),

    /// The adapter has not completed initialization.
    #[error("adapter is not initialized")]
    NotInitialized,
}

/// Errors related to the BGAPI command/response exchange.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// No response arrived before the deadline.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The transaction channel was closed while waiting.
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// A response arrived for a different command than the one in flight.
    #[error("unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        /// The message the transaction was waiting for.
        expected: MessageId,
        /// The message that was received instead.
        actual: MessageId,
    },

    /// Writing to the serial link failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while decoding the byte stream into frames.
///
/// Decoding errors are always recoverable: the decoder has already consumed
/// the offending bytes when it reports one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The header byte does not describe a Bluetooth Smart message.
    #[error("invalid header byte 0x{0:02X}")]
    InvalidHeader(u8),

    /// The class/message pair is not known to this decoder.
    #[error("unknown {} class 0x{class:02X} id 0x{id:02X}", message_kind(.event))]
    UnknownMessage {
        /// Whether the message carried the event bit.
        event: bool,
        /// The class identifier.
        class: u8,
        /// The message identifier within the class.
        id: u8,
    },

    /// The payload is shorter than the message layout requires.
    #[error("truncated payload for class 0x{class:02X} id 0x{id:02X}: needed {needed} bytes, had {available}")]
    Truncated {
        /// The class identifier.
        class: u8,
        /// The message identifier within the class.
        id: u8,
        /// Bytes required to read the next field.
        needed: usize,
        /// Bytes remaining in the payload.
        available: usize,
    },

    /// A UUID field does not have a 2, 4 or 16 byte length.
    #[error("invalid UUID length {length} for class 0x{class:02X} id 0x{id:02X}")]
    InvalidUuid {
        /// The class identifier.
        class: u8,
        /// The message identifier within the class.
        id: u8,
        /// Length of the UUID field.
        length: usize,
    },
}

fn message_kind(event: &bool) -> &'static str {
    if *event { "event" } else { "response" }
}

/// Errors related to the serial transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The serial port could not be opened.
    #[error("failed to open {port}: {message}")]
    Open {
        /// The port that was being opened.
        port: String,
        /// Description of the failure.
        message: String,
    },
}

/// Errors related to adapter configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No serial port was configured.
    #[error("serial port is required")]
    MissingPort,

    /// A Bluetooth address could not be parsed.
    #[error("invalid Bluetooth address: {0}")]
    InvalidAddress(String),

    /// A numeric setting is outside the range accepted by the adapter.
    #[error("{field} value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the offending setting.
        field: &'static str,
        /// Minimum allowed value.
        min: u32,
        /// Maximum allowed value.
        max: u32,
        /// The value that was provided.
        actual: u32,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::OutOfRange {
            field: "connection_latency",
            min: 0,
            max: 500,
            actual: 600,
        };
        assert_eq!(
            err.to_string(),
            "connection_latency value 600 is out of range [0, 500]"
        );
    }

    #[test]
    fn error_from_protocol_error() {
        let err: Error = ProtocolError::Timeout(5000).into();
        assert!(matches!(err, Error::Protocol(ProtocolError::Timeout(5000))));
        assert_eq!(err.to_string(), "protocol error: request timed out after 5000 ms");
    }

    #[test]
    fn decode_error_display() {
        let err = DecodeError::UnknownMessage {
            event: true,
            class: 0x04,
            id: 0x7F,
        };
        assert_eq!(err.to_string(), "unknown event class 0x04 id 0x7F");
    }

    #[test]
    fn command_error_display() {
        let err = Error::Command(BgApiResult::WrongState);
        assert_eq!(err.to_string(), "command failed: device in wrong state (0x0181)");
    }
}
