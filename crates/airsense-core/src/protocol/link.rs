//! Byte link to the sensor

use serialport::SerialPort;
use std::io::{self, Read};
use std::time::Duration;

/// Byte channel a sensor session samples frames from
pub trait SensorLink: Read + Send {
    /// Bound how long a single `read` may block
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Discard anything already received but not yet read
    fn clear_input_buffer(&mut self) -> io::Result<()>;
}

/// Serial port wrapper implementing SensorLink
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    /// Wrap an open, configured port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    /// Port name reported by the driver, if any
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl SensorLink for SerialLink {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port.set_timeout(timeout).map_err(io::Error::other)
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::other)
    }
}
