//! Protocol errors

use thiserror::Error;

use super::session::ReadPhase;

/// Reasons a captured byte window could not be decoded into a reading
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFault {
    /// Capture was not exactly one frame long
    #[error("Incomplete frame: captured {captured} bytes, expected 10")]
    IncompleteFrame {
        /// Bytes actually captured
        captured: usize,
    },

    /// Window does not start with the data-report sync pair
    #[error("Bad sync bytes: expected aa c0, got {head:02x} {command:02x}")]
    BadSync {
        /// Byte 0 of the window
        head: u8,
        /// Byte 1 of the window
        command: u8,
    },

    /// Checksum byte does not match the payload
    #[error("Checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch {
        /// Sum of the payload bytes
        expected: u8,
        /// Checksum byte the frame carried
        actual: u8,
    },

    /// Last byte is not the frame tail
    #[error("Bad tail byte: expected 0xab, got {tail:#04x}")]
    BadTail {
        /// Byte 9 of the window
        tail: u8,
    },
}

/// Link-level failures during a read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IoFault {
    /// No bytes arrived within the timeout
    #[error("Timed out waiting for sensor data")]
    Timeout,

    /// The driver reported an error
    #[error("Serial device error while {phase}: {message}")]
    Device {
        /// Step the failure happened in
        phase: ReadPhase,
        /// Driver error text
        message: String,
    },
}

/// Everything a single session read can fail with
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionFault {
    /// No link is attached
    #[error("Sensor not registered")]
    NotRegistered,

    /// Link failure
    #[error(transparent)]
    Io(#[from] IoFault),

    /// Frame failure
    #[error(transparent)]
    Decode(#[from] DecodeFault),
}

impl SessionFault {
    /// Link noise or timing; worth another attempt on the caller's schedule.
    /// `NotRegistered` is a caller bug and never goes away by retrying.
    pub fn is_transient(&self) -> bool {
        !matches!(self, SessionFault::NotRegistered)
    }
}

/// The serial device could not be opened at the sensor's baud rate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Link unavailable: {port}: {reason}")]
pub struct LinkUnavailable {
    /// Device path that failed to open
    pub port: String,
    /// Driver error text
    pub reason: String,
}

impl LinkUnavailable {
    /// Open failure for `port`
    pub fn new(port: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            port: port.into(),
            reason: reason.to_string(),
        }
    }
}
