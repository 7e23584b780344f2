// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BGAPI result codes.

use std::fmt;

/// Result code carried by BGAPI responses and procedure events.
///
/// Codes are grouped by range: `0x01xx` BGAPI errors, `0x02xx` Bluetooth
/// controller errors, `0x03xx` security manager errors and `0x04xx` attribute
/// protocol errors. Codes without a named variant are kept in [`Other`](Self::Other).
///
/// # Examples
///
/// ```
/// use bluegiga_lib::types::BgApiResult;
///
/// assert!(BgApiResult::from_code(0).is_success());
/// assert_eq!(BgApiResult::from_code(0x0181), BgApiResult::WrongState);
/// assert_eq!(BgApiResult::WrongState.code(), 0x0181);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BgApiResult {
    /// The command completed.
    Success,
    /// A command parameter was invalid.
    InvalidParameter,
    /// The device is in the wrong state to accept the command.
    WrongState,
    /// The device ran out of memory.
    OutOfMemory,
    /// The feature is not implemented by this firmware.
    FeatureNotImplemented,
    /// The command was not recognized.
    CommandNotRecognized,
    /// The command or procedure timed out.
    Timeout,
    /// The connection handle is not connected.
    NotConnected,
    /// Command or procedure failed due to flow control.
    Flow,
    /// The command is too long.
    CommandTooLong,
    /// The controller reports the connection timed out.
    ConnectionTimeout,
    /// The controller has no free connection slots.
    ConnectionLimitExceeded,
    /// The remote user terminated the connection.
    RemoteUserTerminated,
    /// The local host terminated the connection.
    ConnectionTerminatedByLocalHost,
    /// The connection could not be established.
    ConnectionFailedToBeEstablished,
    /// The attribute handle is invalid.
    InvalidHandle,
    /// The attribute cannot be read.
    ReadNotPermitted,
    /// The attribute cannot be written.
    WriteNotPermitted,
    /// Authentication is required before the attribute can be accessed.
    InsufficientAuthentication,
    /// No attribute was found in the requested range.
    AttributeNotFound,
    /// Any other result code.
    Other(u16),
}

impl BgApiResult {
    /// Parses a raw result code.
    #[must_use]
    pub const fn from_code(code: u16) -> Self {
        match code {
            0x0000 => Self::Success,
            0x0180 => Self::InvalidParameter,
            0x0181 => Self::WrongState,
            0x0182 => Self::OutOfMemory,
            0x0183 => Self::FeatureNotImplemented,
            0x0184 => Self::CommandNotRecognized,
            0x0185 => Self::Timeout,
            0x0186 => Self::NotConnected,
            0x0187 => Self::Flow,
            0x018A => Self::CommandTooLong,
            0x0208 => Self::ConnectionTimeout,
            0x0209 => Self::ConnectionLimitExceeded,
            0x0213 => Self::RemoteUserTerminated,
            0x0216 => Self::ConnectionTerminatedByLocalHost,
            0x023E => Self::ConnectionFailedToBeEstablished,
            0x0401 => Self::InvalidHandle,
            0x0402 => Self::ReadNotPermitted,
            0x0403 => Self::WriteNotPermitted,
            0x0405 => Self::InsufficientAuthentication,
            0x040A => Self::AttributeNotFound,
            other => Self::Other(other),
        }
    }

    /// Returns the raw result code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::Success => 0x0000,
            Self::InvalidParameter => 0x0180,
            Self::WrongState => 0x0181,
            Self::OutOfMemory => 0x0182,
            Self::FeatureNotImplemented => 0x0183,
            Self::CommandNotRecognized => 0x0184,
            Self::Timeout => 0x0185,
            Self::NotConnected => 0x0186,
            Self::Flow => 0x0187,
            Self::CommandTooLong => 0x018A,
            Self::ConnectionTimeout => 0x0208,
            Self::ConnectionLimitExceeded => 0x0209,
            Self::RemoteUserTerminated => 0x0213,
            Self::ConnectionTerminatedByLocalHost => 0x0216,
            Self::ConnectionFailedToBeEstablished => 0x023E,
            Self::InvalidHandle => 0x0401,
            Self::ReadNotPermitted => 0x0402,
            Self::WriteNotPermitted => 0x0403,
            Self::InsufficientAuthentication => 0x0405,
            Self::AttributeNotFound => 0x040A,
            Self::Other(code) => *code,
        }
    }

    /// Returns true if the code reports success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns a short description of the code.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::InvalidParameter => "invalid parameter",
            Self::WrongState => "device in wrong state",
            Self::OutOfMemory => "out of memory",
            Self::FeatureNotImplemented => "feature not implemented",
            Self::CommandNotRecognized => "command not recognized",
            Self::Timeout => "timeout",
            Self::NotConnected => "not connected",
            Self::Flow => "flow control",
            Self::CommandTooLong => "command too long",
            Self::ConnectionTimeout => "connection timeout",
            Self::ConnectionLimitExceeded => "connection limit exceeded",
            Self::RemoteUserTerminated => "remote user terminated connection",
            Self::ConnectionTerminatedByLocalHost => "connection terminated by local host",
            Self::ConnectionFailedToBeEstablished => "connection failed to be established",
            Self::InvalidHandle => "invalid attribute handle",
            Self::ReadNotPermitted => "read not permitted",
            Self::WriteNotPermitted => "write not permitted",
            Self::InsufficientAuthentication => "insufficient authentication",
            Self::AttributeNotFound => "attribute not found",
            Self::Other(_) => "unknown result",
        }
    }
}

impl fmt::Display for BgApiResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:04X})", self.description(), self.code())
    }
}

impl From<u16> for BgApiResult {
    fn from(code: u16) -> Self {
        Self::from_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_round_trip() {
        for code in [0x0000, 0x0181, 0x0186, 0x0209, 0x0216, 0x0401, 0x040A] {
            assert_eq!(BgApiResult::from_code(code).code(), code);
        }
    }

    #[test]
    fn unknown_code_is_preserved() {
        let result = BgApiResult::from_code(0x0999);
        assert_eq!(result, BgApiResult::Other(0x0999));
        assert_eq!(result.code(), 0x0999);
        assert!(!result.is_success());
    }

    #[test]
    fn display_includes_code() {
        assert_eq!(
            BgApiResult::ConnectionLimitExceeded.to_string(),
            "connection limit exceeded (0x0209)"
        );
    }
}
