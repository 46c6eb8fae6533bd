#![allow(dead_code)]

use airsense_core::protocol::{FrameBuilder, SensorLink, SessionConfig};
use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the mock sensor transmits after the next input flush
pub enum Step {
    /// These bytes arrive, then the line goes quiet
    Bytes(Vec<u8>),
    /// Nothing arrives
    Silent,
    /// The next read fails with this error
    ReadError(ErrorKind),
    /// The flush itself fails
    FlushError,
    /// The next read blocks this long before delivering the bytes
    Slow(Duration, Vec<u8>),
}

/// Everything the session did to the link, in order
#[derive(Debug, Default)]
pub struct LinkLog {
    pub events: Vec<&'static str>,
    pub timeouts: Vec<Duration>,
}

impl LinkLog {
    pub fn count(&self, event: &str) -> usize {
        self.events.iter().filter(|e| **e == event).count()
    }
}

/// Mock serial link driven by a script of transmissions
pub struct ScriptedLink {
    steps: VecDeque<Step>,
    pending: VecDeque<u8>,
    pending_error: Option<ErrorKind>,
    delay: Option<Duration>,
    log: Arc<Mutex<LinkLog>>,
}

impl ScriptedLink {
    pub fn new(steps: Vec<Step>) -> (Self, Arc<Mutex<LinkLog>>) {
        let log = Arc::new(Mutex::new(LinkLog::default()));
        let link = Self {
            steps: steps.into(),
            pending: VecDeque::new(),
            pending_error: None,
            delay: None,
            log: Arc::clone(&log),
        };
        (link, log)
    }

    fn record(&self, event: &'static str) {
        self.log.lock().unwrap().events.push(event);
    }
}

impl Read for ScriptedLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.record("read");
        if let Some(delay) = self.delay.take() {
            std::thread::sleep(delay);
        }
        if let Some(kind) = self.pending_error.take() {
            return Err(io::Error::new(kind, "scripted read failure"));
        }
        if self.pending.is_empty() {
            return Err(io::Error::from(ErrorKind::TimedOut));
        }
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl SensorLink for ScriptedLink {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.log.lock().unwrap().timeouts.push(timeout);
        Ok(())
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.record("flush");
        self.pending.clear();
        self.pending_error = None;
        self.delay = None;

        match self.steps.pop_front() {
            Some(Step::Bytes(bytes)) => self.pending.extend(bytes),
            Some(Step::Silent) | None => {}
            Some(Step::ReadError(kind)) => self.pending_error = Some(kind),
            Some(Step::FlushError) => {
                return Err(io::Error::new(ErrorKind::BrokenPipe, "scripted flush failure"))
            }
            Some(Step::Slow(delay, bytes)) => {
                self.delay = Some(delay);
                self.pending.extend(bytes);
            }
        }
        Ok(())
    }
}

/// Session config with no settle delay and a short timeout
pub fn fast_config() -> SessionConfig {
    SessionConfig {
        timeout: Duration::from_millis(200),
        settle_delay: Duration::ZERO,
        ..SessionConfig::default()
    }
}

/// Well-formed frame bytes
pub fn frame(pm25_raw: u16, pm10_raw: u16) -> Vec<u8> {
    FrameBuilder::new()
        .pm25_raw(pm25_raw)
        .pm10_raw(pm10_raw)
        .device_id(0x1234)
        .build()
        .as_bytes()
        .to_vec()
}

/// Frame bytes with the checksum byte off by one
pub fn corrupt_frame(pm25_raw: u16, pm10_raw: u16) -> Vec<u8> {
    let mut bytes = frame(pm25_raw, pm10_raw);
    bytes[8] = bytes[8].wrapping_add(1);
    bytes
}
