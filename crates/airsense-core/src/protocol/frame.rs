//! Frame decoding
//!
//! Validates and decodes the SDS021 10-byte data-report frame.
//!
//! Frame format:
//! - 1 byte: Head (0xAA)
//! - 1 byte: Command id (0xC0 for data reports)
//! - 2 bytes: PM2.5 in tenths of µg/m³ (little-endian)
//! - 2 bytes: PM10 in tenths of µg/m³ (little-endian)
//! - 2 bytes: Device id
//! - 1 byte: Checksum (low byte of the sum of bytes 2..=7)
//! - 1 byte: Tail (0xAB)
//!
//! Every capture is decoded on its own. Nothing is buffered between calls, so a
//! byte stream that has slipped out of alignment keeps failing until the window
//! happens to line up with a frame boundary again. [`decode_scan`] is the opt-in
//! alternative that searches a longer capture for the sync bytes.

use byteorder::{ByteOrder, LittleEndian};

use super::{DecodeFault, Reading, DATA_REPORT_ID, FRAME_LEN, HEAD, TAIL};

/// Strictness knobs for frame validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Reject frames whose last byte is not 0xAB.
    /// Off by default.
    pub strict_tail: bool,
}

/// One captured data-report window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; FRAME_LEN],
}

impl Frame {
    /// Capture a frame from raw bytes
    ///
    /// Only the length is checked here; content is validated by [`Frame::decode`].
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeFault> {
        let bytes: [u8; FRAME_LEN] = data
            .try_into()
            .map_err(|_| DecodeFault::IncompleteFrame {
                captured: data.len(),
            })?;
        Ok(Self { bytes })
    }

    /// Validate sync bytes and checksum, then decode the concentrations
    pub fn decode(&self, options: &DecodeOptions) -> Result<Reading, DecodeFault> {
        let b = &self.bytes;

        if b[0] != HEAD || b[1] != DATA_REPORT_ID {
            return Err(DecodeFault::BadSync {
                head: b[0],
                command: b[1],
            });
        }

        let expected = checksum(&b[2..8]);
        if expected != b[8] {
            return Err(DecodeFault::ChecksumMismatch {
                expected,
                actual: b[8],
            });
        }

        if options.strict_tail && b[9] != TAIL {
            return Err(DecodeFault::BadTail { tail: b[9] });
        }

        Ok(Reading::from_raw(
            LittleEndian::read_u16(&b[2..4]),
            LittleEndian::read_u16(&b[4..6]),
        ))
    }

    /// Raw frame bytes
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.bytes
    }

    /// Sensor id carried in bytes 6 and 7
    pub fn device_id(&self) -> u16 {
        LittleEndian::read_u16(&self.bytes[6..8])
    }
}

/// Decode one captured window with default options
pub fn decode(data: &[u8]) -> Result<Reading, DecodeFault> {
    decode_with(data, &DecodeOptions::default())
}

/// Decode one captured window
pub fn decode_with(data: &[u8], options: &DecodeOptions) -> Result<Reading, DecodeFault> {
    Frame::from_bytes(data)?.decode(options)
}

/// Decode the first valid frame found anywhere in `data`
///
/// Every position where `AA C0` starts a complete 10-byte window is tried in
/// order. When nothing decodes, the fault of the first candidate is returned,
/// or `BadSync` when the capture has no sync pair at all.
pub fn decode_scan(data: &[u8], options: &DecodeOptions) -> Result<Reading, DecodeFault> {
    if data.len() < FRAME_LEN {
        return Err(DecodeFault::IncompleteFrame {
            captured: data.len(),
        });
    }

    let mut first_fault = None;
    for (offset, pair) in data.windows(2).enumerate() {
        if pair[0] != HEAD || pair[1] != DATA_REPORT_ID {
            continue;
        }

        let Some(window) = data.get(offset..offset + FRAME_LEN) else {
            // Sync pair too close to the end of the capture
            first_fault.get_or_insert(DecodeFault::IncompleteFrame {
                captured: data.len() - offset,
            });
            break;
        };

        match decode_with(window, options) {
            Ok(reading) => return Ok(reading),
            Err(fault) => {
                first_fault.get_or_insert(fault);
            }
        }
    }

    Err(first_fault.unwrap_or(DecodeFault::BadSync {
        head: data[0],
        command: data[1],
    }))
}

/// Low byte of the sum of `payload`
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Render bytes as space-separated hex pairs, e.g. `"aa c0 2c"`
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builder for well-formed data-report frames
#[derive(Debug, Clone, Default)]
pub struct FrameBuilder {
    pm25_raw: u16,
    pm10_raw: u16,
    device_id: u16,
}

impl FrameBuilder {
    /// Create a new frame builder
    pub fn new() -> Self {
        Self::default()
    }

    /// PM2.5 in tenths of µg/m³
    pub fn pm25_raw(mut self, value: u16) -> Self {
        self.pm25_raw = value;
        self
    }

    /// PM10 in tenths of µg/m³
    pub fn pm10_raw(mut self, value: u16) -> Self {
        self.pm10_raw = value;
        self
    }

    /// Sensor id
    pub fn device_id(mut self, value: u16) -> Self {
        self.device_id = value;
        self
    }

    /// Build the frame, filling in sync bytes, checksum and tail
    pub fn build(self) -> Frame {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = HEAD;
        bytes[1] = DATA_REPORT_ID;
        LittleEndian::write_u16(&mut bytes[2..4], self.pm25_raw);
        LittleEndian::write_u16(&mut bytes[4..6], self.pm10_raw);
        LittleEndian::write_u16(&mut bytes[6..8], self.device_id);
        bytes[8] = checksum(&bytes[2..8]);
        bytes[9] = TAIL;
        Frame { bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_produces_decodable_frame() {
        let frame = FrameBuilder::new()
            .pm25_raw(300)
            .pm10_raw(70)
            .device_id(0xBEEF)
            .build();

        let reading = frame.decode(&DecodeOptions::default()).expect("valid frame");
        assert_eq!(reading.pm25_raw(), 300);
        assert_eq!(reading.pm10_raw(), 70);
        assert_eq!(frame.device_id(), 0xBEEF);
        assert_eq!(frame.as_bytes()[9], TAIL);
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum(&[0xFF, 0xFF, 0x02]), 0x00);
        assert_eq!(checksum(&[0x2C, 0x01, 0x46, 0x00, 0x00, 0x00]), 0x73);
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0xAA, 0xC0, 0x05]), "aa c0 05");
        assert_eq!(to_hex(&[]), "");
    }

    #[test]
    fn test_strict_tail() {
        let mut bytes = *FrameBuilder::new().pm25_raw(12).build().as_bytes();
        bytes[9] = 0x00;

        assert!(decode(&bytes).is_ok());
        assert_eq!(
            decode_with(&bytes, &DecodeOptions { strict_tail: true }),
            Err(DecodeFault::BadTail { tail: 0x00 })
        );
    }

    #[test]
    fn test_strict_tail_checked_after_checksum() {
        let mut bytes = *FrameBuilder::new().pm25_raw(12).build().as_bytes();
        bytes[8] = bytes[8].wrapping_add(1);
        bytes[9] = 0x00;

        assert!(matches!(
            decode_with(&bytes, &DecodeOptions { strict_tail: true }),
            Err(DecodeFault::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_scan_skips_stale_prefix() {
        let frame = FrameBuilder::new().pm25_raw(55).pm10_raw(99).build();
        let mut capture = vec![0x12, 0x00, 0xAB];
        capture.extend_from_slice(frame.as_bytes());

        let reading = decode_scan(&capture, &DecodeOptions::default()).unwrap();
        assert_eq!(reading.pm25_raw(), 55);
        assert_eq!(reading.pm10_raw(), 99);
    }

    #[test]
    fn test_scan_skips_corrupt_candidate() {
        let good = FrameBuilder::new().pm25_raw(10).pm10_raw(20).build();
        let mut bad = *FrameBuilder::new().pm25_raw(1).build().as_bytes();
        bad[8] ^= 0xFF;

        let mut capture = bad.to_vec();
        capture.extend_from_slice(good.as_bytes());

        let reading = decode_scan(&capture, &DecodeOptions::default()).unwrap();
        assert_eq!(reading.pm25_raw(), 10);
    }

    #[test]
    fn test_scan_reports_first_candidate_fault() {
        let mut bad = *FrameBuilder::new().pm25_raw(1).build().as_bytes();
        bad[8] ^= 0xFF;
        let mut capture = vec![0x00, 0x00];
        capture.extend_from_slice(&bad);

        assert!(matches!(
            decode_scan(&capture, &DecodeOptions::default()),
            Err(DecodeFault::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_scan_header_near_end() {
        let frame = FrameBuilder::new().build();
        let mut capture = vec![0u8; 8];
        capture.extend_from_slice(&frame.as_bytes()[..4]);

        assert_eq!(
            decode_scan(&capture, &DecodeOptions::default()),
            Err(DecodeFault::IncompleteFrame { captured: 4 })
        );
    }

    #[test]
    fn test_scan_without_sync() {
        let capture = [0x01u8; 12];
        assert_eq!(
            decode_scan(&capture, &DecodeOptions::default()),
            Err(DecodeFault::BadSync {
                head: 0x01,
                command: 0x01
            })
        );
    }

    #[test]
    fn test_scan_short_capture() {
        assert_eq!(
            decode_scan(&[HEAD, DATA_REPORT_ID], &DecodeOptions::default()),
            Err(DecodeFault::IncompleteFrame { captured: 2 })
        );
    }
}
