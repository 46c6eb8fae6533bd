//! SDS021 Serial Protocol
//!
//! Implements the particulate sensor's data-report framing over a 9600 baud UART.
//!
//! The sensor pushes a 10-byte frame roughly once per second with no handshake:
//!
//! ```text
//! AA C0 | PM2.5 lo hi | PM10 lo hi | ID lo hi | CHK | AB
//! ```
//!
//! `CHK` is the low byte of the sum of bytes 2 through 7.

mod error;
pub mod frame;
pub mod link;
mod reading;
pub mod serial;
mod session;

pub use error::{DecodeFault, IoFault, LinkUnavailable, SessionFault};
pub use frame::{decode, decode_scan, decode_with, DecodeOptions, Frame, FrameBuilder};
pub use link::{SensorLink, SerialLink};
pub use reading::Reading;
pub use serial::{list_ports, open_port, PortInfo};
pub use session::{ReadPhase, SerialPollSession, SessionConfig, SessionStats, SyncMode};

/// Fixed baud rate of the sensor's UART
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default bounded wait for a full frame window in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1500;

/// Default pause between flushing the input buffer and reading, in milliseconds
/// Gives the sensor time to finish a frame already in flight.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

/// Length of one data-report frame
pub const FRAME_LEN: usize = 10;

/// Largest resync lookahead; a scan window covers at most four frames
pub const MAX_RESYNC_LOOKAHEAD: usize = 3 * FRAME_LEN;

/// Byte that marks the beginning of every frame
pub const HEAD: u8 = 0xAA;

/// Command id of a data-report frame
pub const DATA_REPORT_ID: u8 = 0xC0;

/// Byte that marks the end of every frame
pub const TAIL: u8 = 0xAB;
