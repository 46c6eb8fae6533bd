//! Session management
//!
//! Owns the serial link and turns one read request into exactly one decode
//! attempt: flush stale input, settle, capture a window, decode.

use serde::Serialize;
use std::fmt;
use std::io::{self, ErrorKind};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::{
    frame::{decode_scan, decode_with, to_hex},
    link::{SensorLink, SerialLink},
    serial::open_port,
    DecodeFault, DecodeOptions, IoFault, LinkUnavailable, Reading, SessionFault,
    DEFAULT_BAUD_RATE, DEFAULT_SETTLE_DELAY_MS, DEFAULT_TIMEOUT_MS, FRAME_LEN,
    MAX_RESYNC_LOOKAHEAD,
};

/// How a captured window is aligned to frame boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Read exactly one frame length and decode it as-is
    #[default]
    Aligned,
    /// Read up to `lookahead` extra bytes and search them for the sync pair
    Scan {
        /// Extra bytes captured beyond one frame, capped at `MAX_RESYNC_LOOKAHEAD`
        lookahead: usize,
    },
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Baud rate
    pub baud_rate: u32,
    /// Bounded wait for a full window
    pub timeout: Duration,
    /// Pause between flushing input and reading
    pub settle_delay: Duration,
    /// Window alignment strategy
    pub sync: SyncMode,
    /// Reject frames with a bad tail byte
    pub strict_tail: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            sync: SyncMode::Aligned,
            strict_tail: false,
        }
    }
}

impl SessionConfig {
    fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            strict_tail: self.strict_tail,
        }
    }

    fn window_len(&self) -> usize {
        match self.sync {
            SyncMode::Aligned => FRAME_LEN,
            SyncMode::Scan { lookahead } => FRAME_LEN + lookahead.min(MAX_RESYNC_LOOKAHEAD),
        }
    }
}

/// Step of a read that touches the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPhase {
    /// Discarding stale input
    Flushing,
    /// Capturing the frame window
    Reading,
}

impl fmt::Display for ReadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadPhase::Flushing => f.write_str("flushing input"),
            ReadPhase::Reading => f.write_str("reading frame"),
        }
    }
}

/// Per-session outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Calls to `read`
    pub attempts: u64,
    /// Successful decodes
    pub readings: u64,
    /// Reads with no link attached
    pub not_registered: u64,
    /// Nothing arrived before the timeout
    pub timeouts: u64,
    /// Flush or read failures reported by the device
    pub device_errors: u64,
    /// Short captures
    pub incomplete_frames: u64,
    /// Wrong head or command byte
    pub bad_sync: u64,
    /// Checksum byte did not match
    pub checksum_mismatches: u64,
    /// Bad tail byte (strict tail only)
    pub bad_tails: u64,
}

impl SessionStats {
    fn record(&mut self, result: &Result<Reading, SessionFault>) {
        self.attempts = self.attempts.saturating_add(1);
        let counter = match result {
            Ok(_) => &mut self.readings,
            Err(SessionFault::NotRegistered) => &mut self.not_registered,
            Err(SessionFault::Io(IoFault::Timeout)) => &mut self.timeouts,
            Err(SessionFault::Io(IoFault::Device { .. })) => &mut self.device_errors,
            Err(SessionFault::Decode(DecodeFault::IncompleteFrame { .. })) => {
                &mut self.incomplete_frames
            }
            Err(SessionFault::Decode(DecodeFault::BadSync { .. })) => &mut self.bad_sync,
            Err(SessionFault::Decode(DecodeFault::ChecksumMismatch { .. })) => {
                &mut self.checksum_mismatches
            }
            Err(SessionFault::Decode(DecodeFault::BadTail { .. })) => &mut self.bad_tails,
        };
        *counter = counter.saturating_add(1);
    }

    /// Attempts that did not produce a reading
    pub fn faults(&self) -> u64 {
        self.attempts - self.readings
    }
}

/// Polling session over one particulate sensor link
///
/// A session is the only user of its link. Reads are blocking and take
/// `&mut self`; callers that need concurrency or cancellation layer it on top.
pub struct SerialPollSession {
    link: Option<Box<dyn SensorLink>>,
    config: SessionConfig,
    stats: SessionStats,
}

impl SerialPollSession {
    /// Open the serial device at `device_path`
    pub fn open(device_path: &str, config: SessionConfig) -> Result<Self, LinkUnavailable> {
        let port = open_port(device_path, Some(config.baud_rate))?;
        let link = SerialLink::new(port);
        debug!(port = ?link.name(), baud = config.baud_rate, "Particulate link opened");
        Ok(Self::with_link(link, config))
    }

    /// Wrap an already-open link
    pub fn with_link(link: impl SensorLink + 'static, config: SessionConfig) -> Self {
        Self {
            link: Some(Box::new(link)),
            config,
            stats: SessionStats::default(),
        }
    }

    /// A session with no link; every read fails with `NotRegistered`
    pub fn unregistered(config: SessionConfig) -> Self {
        Self {
            link: None,
            config,
            stats: SessionStats::default(),
        }
    }

    /// Whether a link is attached
    pub fn is_registered(&self) -> bool {
        self.link.is_some()
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Outcome counters since the session was created
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Release the link
    pub fn close(&mut self) {
        self.link = None;
    }

    /// Take one reading
    ///
    /// Blocks for up to `settle_delay + timeout`. Any fault is returned as-is
    /// and leaves the session ready for the next call.
    pub fn read(&mut self) -> Result<Reading, SessionFault> {
        let result = self.read_once();
        self.stats.record(&result);
        result
    }

    fn read_once(&mut self) -> Result<Reading, SessionFault> {
        let link = self.link.as_mut().ok_or(SessionFault::NotRegistered)?;

        link.clear_input_buffer()
            .map_err(|e| device_fault(ReadPhase::Flushing, e))?;

        if !self.config.settle_delay.is_zero() {
            std::thread::sleep(self.config.settle_delay);
        }

        let options = self.config.decode_options();
        let capture = match self.config.sync {
            SyncMode::Aligned => {
                read_window(&mut **link, FRAME_LEN, self.config.timeout, |_| false)?
            }
            SyncMode::Scan { .. } => read_window(
                &mut **link,
                self.config.window_len(),
                self.config.timeout,
                |bytes| decode_scan(bytes, &options).is_ok(),
            )?,
        };

        trace!(window = %to_hex(&capture), "Captured frame window");

        let reading = match self.config.sync {
            SyncMode::Aligned => decode_with(&capture, &options),
            SyncMode::Scan { .. } => decode_scan(&capture, &options),
        }
        .inspect_err(|fault| debug!(error = %fault, len = capture.len(), "Frame rejected"))?;
        Ok(reading)
    }
}

fn device_fault(phase: ReadPhase, err: io::Error) -> IoFault {
    IoFault::Device {
        phase,
        message: err.to_string(),
    }
}

/// Read until `capacity` bytes arrive, `complete` accepts the capture, the
/// link reports end of data, or `timeout` elapses.
///
/// An empty capture is a timeout; a short one is handed on for decoding.
fn read_window(
    link: &mut dyn SensorLink,
    capacity: usize,
    timeout: Duration,
    complete: impl Fn(&[u8]) -> bool,
) -> Result<Vec<u8>, IoFault> {
    let deadline = Instant::now() + timeout;
    let mut buf = vec![0u8; capacity];
    let mut filled = 0;

    while filled < capacity {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        link.set_timeout(remaining)
            .map_err(|e| device_fault(ReadPhase::Reading, e))?;

        match link.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => {
                filled += n;
                if complete(&buf[..filled]) {
                    break;
                }
            }
            Err(ref e) if e.kind() == ErrorKind::TimedOut => break,
            Err(ref e)
                if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted =>
            {
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(e) => return Err(device_fault(ReadPhase::Reading, e)),
        }
    }

    if filled == 0 {
        return Err(IoFault::Timeout);
    }
    buf.truncate(filled);
    Ok(buf)
}
