//! Demo Mode - Simulated SDS021 byte stream for running without hardware
//!
//! Produces realistic indoor particulate levels around 8 µg/m³ PM2.5 with
//! occasional smoke plumes (cooking, candles) that spike and decay. Link faults
//! can be injected at configurable rates to exercise the error paths.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::io::{self, Read};
use std::time::Duration;

use crate::protocol::{FrameBuilder, SensorLink};

/// Probability of each injected link fault per read
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaultRates {
    /// Frame arrives with a corrupted checksum
    pub corrupt: f64,
    /// Only part of the frame arrives before the link goes quiet
    pub truncate: f64,
    /// A few stray bytes precede the frame, pushing it out of alignment
    pub shift: f64,
    /// Nothing arrives at all
    pub silent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PlumeState {
    /// Background level
    Clean,
    /// Concentration climbing toward the plume peak
    Rising { frames_left: u32 },
    /// Exponential decay back to background
    Decaying,
}

/// Simulated sensor link
///
/// Every input flush stands in for the sensor pushing its next frame, so each
/// session read sees exactly one fresh transmission (plus the one after it, so
/// scanning reads have something to realign onto).
pub struct DemoLink {
    rng: StdRng,
    faults: FaultRates,
    device_id: u16,
    pending: VecDeque<u8>,
    /// PM2.5 in µg/m³ (smoothed)
    pm25: f64,
    plume_peak: f64,
    plume_state: PlumeState,
    frames_until_plume: u32,
}

impl Default for DemoLink {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoLink {
    /// Create a demo link seeded from system entropy
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Create a reproducible demo link
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(mut rng: StdRng) -> Self {
        let frames_until_plume = rng.gen_range(60..300);
        let device_id = rng.gen();
        Self {
            rng,
            faults: FaultRates::default(),
            device_id,
            pending: VecDeque::new(),
            pm25: 8.0,
            plume_peak: 0.0,
            plume_state: PlumeState::Clean,
            frames_until_plume,
        }
    }

    /// Inject link faults at the given rates
    pub fn with_faults(mut self, faults: FaultRates) -> Self {
        self.faults = faults;
        self
    }

    /// Id the simulated sensor reports in bytes 6-7
    pub fn device_id(&self) -> u16 {
        self.device_id
    }

    /// Advance the simulation by one frame and return raw (pm25, pm10) tenths
    fn next_raw(&mut self) -> (u16, u16) {
        const BACKGROUND: f64 = 8.0;
        const RISE_FRAMES: u32 = 20;

        match self.plume_state {
            PlumeState::Clean => {
                if self.frames_until_plume == 0 {
                    self.plume_peak = self.rng.gen_range(60.0..250.0);
                    self.plume_state = PlumeState::Rising {
                        frames_left: RISE_FRAMES,
                    };
                } else {
                    self.frames_until_plume -= 1;
                }
                self.pm25 += (BACKGROUND - self.pm25) * 0.1;
            }
            PlumeState::Rising { frames_left } => {
                self.pm25 += (self.plume_peak - self.pm25) / f64::from(frames_left.max(1));
                self.plume_state = match frames_left {
                    0 | 1 => PlumeState::Decaying,
                    n => PlumeState::Rising { frames_left: n - 1 },
                };
            }
            PlumeState::Decaying => {
                self.pm25 += (BACKGROUND - self.pm25) * 0.03;
                if (self.pm25 - BACKGROUND).abs() < 1.0 {
                    self.plume_state = PlumeState::Clean;
                    self.frames_until_plume = self.rng.gen_range(300..900);
                }
            }
        }

        let noise = self.rng.gen_range(-0.4..0.4);
        let pm25 = (self.pm25 + noise).clamp(0.0, 999.9);
        // Coarse fraction rides on top of the fine one
        let pm10 = (pm25 * self.rng.gen_range(1.3..1.8)).clamp(0.0, 999.9);

        ((pm25 * 10.0).round() as u16, (pm10 * 10.0).round() as u16)
    }

    fn next_frame_bytes(&mut self) -> [u8; crate::protocol::FRAME_LEN] {
        let (pm25, pm10) = self.next_raw();
        *FrameBuilder::new()
            .pm25_raw(pm25)
            .pm10_raw(pm10)
            .device_id(self.device_id)
            .build()
            .as_bytes()
    }

    /// Queue the next transmission, applying fault injection
    fn transmit(&mut self) {
        if self.rng.gen_bool(self.faults.silent.clamp(0.0, 1.0)) {
            return;
        }

        if self.rng.gen_bool(self.faults.shift.clamp(0.0, 1.0)) {
            let stray = self.rng.gen_range(1..4);
            for _ in 0..stray {
                let b = self.rng.gen();
                self.pending.push_back(b);
            }
        }

        let mut frame = self.next_frame_bytes();
        if self.rng.gen_bool(self.faults.corrupt.clamp(0.0, 1.0)) {
            frame[8] = frame[8].wrapping_add(self.rng.gen_range(1..=255));
        }

        if self.rng.gen_bool(self.faults.truncate.clamp(0.0, 1.0)) {
            let keep = self.rng.gen_range(1..frame.len());
            self.pending.extend(&frame[..keep]);
            return;
        }
        self.pending.extend(frame);

        // The sensor keeps streaming; the following frame is already on its way
        let following = self.next_frame_bytes();
        self.pending.extend(following);
    }
}

impl Read for DemoLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            return Err(io::Error::from(io::ErrorKind::TimedOut));
        }
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl SensorLink for DemoLink {
    fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.pending.clear();
        self.transmit();
        Ok(())
    }
}
