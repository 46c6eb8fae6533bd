use airsense_core::protocol::{decode, frame::checksum, DecodeFault, Frame};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Scenario A bytes with the checksum computed from the payload
fn scenario_a() -> [u8; 10] {
    let mut w = [0xAA, 0xC0, 0x2C, 0x01, 0x46, 0x00, 0x00, 0x00, 0x00, 0xAB];
    w[8] = checksum(&w[2..8]);
    w
}

fn random_window(rng: &mut StdRng) -> [u8; 10] {
    let mut w = [0u8; 10];
    rng.fill(&mut w[..]);
    w
}

#[test]
fn test_scenario_a_decodes() {
    let w = scenario_a();
    assert_eq!(w[8], 0x73);

    let reading = decode(&w).expect("valid frame");
    assert_eq!(reading.pm25(), 30.0);
    assert_eq!(reading.pm10(), 7.0);
}

#[test]
fn test_scenario_b_checksum_off_by_one() {
    let mut w = scenario_a();
    w[8] += 1;
    assert_eq!(
        decode(&w),
        Err(DecodeFault::ChecksumMismatch {
            expected: 0x73,
            actual: 0x74
        })
    );
}

#[test]
fn test_scenario_c_wrong_head() {
    let mut w = scenario_a();
    w[0] = 0xAB;
    assert_eq!(
        decode(&w),
        Err(DecodeFault::BadSync {
            head: 0xAB,
            command: 0xC0
        })
    );
}

#[test]
fn test_scenario_d_truncated_capture() {
    let w = scenario_a();
    assert_eq!(
        decode(&w[..6]),
        Err(DecodeFault::IncompleteFrame { captured: 6 })
    );
}

#[test]
fn test_wrong_command_id() {
    let mut w = scenario_a();
    w[1] = 0xC5; // command reply, not a data report
    assert!(matches!(decode(&w), Err(DecodeFault::BadSync { .. })));
}

#[test]
fn test_any_length_other_than_ten_is_incomplete() {
    let long = [0xAAu8; 32];
    for len in (0..32).filter(|n| *n != 10) {
        assert_eq!(
            decode(&long[..len]),
            Err(DecodeFault::IncompleteFrame { captured: len })
        );
    }
}

#[test]
fn test_valid_windows_decode_to_scaled_values() {
    let mut rng = StdRng::seed_from_u64(0x5d5021);
    for _ in 0..1000 {
        let mut w = random_window(&mut rng);
        w[0] = 0xAA;
        w[1] = 0xC0;
        w[8] = checksum(&w[2..8]);

        let reading = decode(&w).expect("checksum-correct window");
        let pm25_raw = u16::from(w[2]) + u16::from(w[3]) * 256;
        let pm10_raw = u16::from(w[4]) + u16::from(w[5]) * 256;
        assert_eq!(reading.pm25(), f64::from(pm25_raw) / 10.0);
        assert_eq!(reading.pm10(), f64::from(pm10_raw) / 10.0);
    }
}

#[test]
fn test_bad_header_always_bad_sync() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..1000 {
        let w = random_window(&mut rng);
        if w[0] == 0xAA && w[1] == 0xC0 {
            continue;
        }
        assert!(matches!(decode(&w), Err(DecodeFault::BadSync { .. })));
    }
}

#[test]
fn test_bad_checksum_always_mismatch() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..1000 {
        let mut w = random_window(&mut rng);
        w[0] = 0xAA;
        w[1] = 0xC0;
        let good = checksum(&w[2..8]);
        w[8] = good.wrapping_add(rng.gen_range(1..=255));

        assert_eq!(
            decode(&w),
            Err(DecodeFault::ChecksumMismatch {
                expected: good,
                actual: w[8]
            })
        );
    }
}

#[test]
fn test_tail_not_checked_by_default() {
    let mut w = scenario_a();
    w[9] = 0x00;
    assert!(decode(&w).is_ok());
}

#[test]
fn test_decode_is_idempotent() {
    let w = scenario_a();
    assert_eq!(decode(&w), decode(&w));

    let mut bad = scenario_a();
    bad[8] ^= 0x0F;
    assert_eq!(decode(&bad), decode(&bad));
}

#[test]
fn test_frame_capture_checks_length_only() {
    let mut w = scenario_a();
    w[0] = 0x00;
    let frame = Frame::from_bytes(&w).expect("length is right");
    assert_eq!(frame.as_bytes(), &w);
    assert_eq!(frame.device_id(), 0);
}
