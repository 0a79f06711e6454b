//! Integration tests for report decoding and calibration
//!
//! Checks the byte order of the measurement report and the calibration model
//! across the full range of raw counts.

use proptest::prelude::*;
use protocol::{
    CALIBRATION, CalibrationConstants, Measurement, RawReport, SensorCounts, calibrate,
    calibrate_with, decode, hex_dump,
};

const EPSILON: f64 = 1e-9;

mod decoding {
    use super::*;

    #[test]
    fn test_known_report() {
        let counts = decode(&[0x12, 0x34, 0x56, 0x78, 0, 0, 0]);
        assert_eq!(counts.so_rh, 4660);
        assert_eq!(counts.so_t, 22136);
    }

    proptest! {
        #[test]
        fn encode_then_decode_preserves_counts(so_rh in any::<u16>(), so_t in any::<u16>()) {
            let report = RawReport::encode(SensorCounts { so_rh, so_t });
            let counts = report.decode();
            prop_assert_eq!(counts.so_rh, so_rh);
            prop_assert_eq!(counts.so_t, so_t);
            prop_assert_eq!(&report.as_bytes()[4..], &[0u8, 0, 0][..]);
        }

        #[test]
        fn high_byte_comes_first(hi in any::<u8>(), lo in any::<u8>()) {
            let counts = decode(&[hi, lo, lo, hi, 0, 0, 0]);
            prop_assert_eq!(counts.so_rh, u16::from(hi) << 8 | u16::from(lo));
            prop_assert_eq!(counts.so_t, u16::from(lo) << 8 | u16::from(hi));
        }
    }
}

mod calibration {
    use super::*;

    #[test]
    fn test_all_zero_counts() {
        let m = calibrate(0, 0);
        assert!((m.temp_c + 40.0).abs() < EPSILON);
        assert!((m.temp_f + 40.0).abs() < EPSILON);
        assert!((m.humidity_pct + 4.65).abs() < EPSILON);
    }

    #[test]
    fn test_temperature_is_linear_over_full_range() {
        for so_t in 0..=u16::MAX {
            let m = calibrate(so_t, 0);
            let expected = CALIBRATION.d1 + CALIBRATION.d2_c * f64::from(so_t);
            assert_eq!(m.temp_c, expected);
        }
    }

    #[test]
    fn test_end_to_end_report() {
        let report = RawReport([0x28, 0x9A, 0x37, 0x12, 0, 0, 0]);
        let counts = report.decode();
        assert_eq!(counts.so_rh, 10394);
        assert_eq!(counts.so_t, 14098);

        let m = Measurement::from_report(&report);
        let so_rh = 10394.0_f64;
        let so_t = 14098.0_f64;
        let temp_c = -40.0 + 0.01 * so_t;
        let temp_f = -40.0 + 0.018 * so_t;
        let rh_linear = -4.0 + 0.0405 * so_rh + -0.0000028 * so_rh * so_rh;
        let humidity = (temp_c - 25.0) * (0.01 + 0.00008 * so_rh) + rh_linear;

        assert!((m.temp_c - temp_c).abs() < EPSILON);
        assert!((m.temp_f - temp_f).abs() < EPSILON);
        assert!((m.humidity_pct - humidity).abs() < EPSILON);
        assert_eq!(format!("{:.2}", m.temp_c), "100.98");
        assert_eq!(format!("{:.2}", m.temp_f), "213.76");
    }

    #[test]
    fn test_custom_coefficients() {
        // 3.5V supply variant of the sensor shifts only the temperature offset
        let k = CalibrationConstants {
            d1: -39.7,
            ..CALIBRATION
        };
        let shifted = calibrate_with(&k, 6500, 0);
        let stock = calibrate(6500, 0);

        assert!((shifted.temp_c - 25.3).abs() < EPSILON);
        assert!((shifted.temp_c - stock.temp_c - 0.3).abs() < EPSILON);
        assert_eq!(calibrate_with(&CALIBRATION, 6500, 1200), calibrate(6500, 1200));
    }

    proptest! {
        #[test]
        fn humidity_depends_on_temperature_only_through_temp_c(
            so_t in any::<u16>(),
            so_rh in any::<u16>(),
        ) {
            let m = calibrate(so_t, so_rh);
            let so_rh = f64::from(so_rh);
            let k = CALIBRATION;
            let rh_linear = k.c1 + k.c2 * so_rh + k.c3 * so_rh * so_rh;
            let expected = (m.temp_c - 25.0) * (k.t1 + k.t2 * so_rh) + rh_linear;
            prop_assert!((m.humidity_pct - expected).abs() < 1e-6);
        }

        #[test]
        fn fahrenheit_uses_its_own_slope(so_t in any::<u16>()) {
            let m = calibrate(so_t, 0);
            let expected = CALIBRATION.d1 + CALIBRATION.d2_f * f64::from(so_t);
            prop_assert!((m.temp_f - expected).abs() < EPSILON);
        }
    }
}

mod debug_trace {
    use super::*;

    #[test]
    fn test_dump_of_report() {
        let lines = hex_dump(RawReport([0x28, 0x9A, 0x37, 0x12, 0, 0, 0]).as_bytes());
        assert_eq!(lines, vec!["28 9a 37 12 00 00 00".to_string()]);
    }

    #[test]
    fn test_measurement_serializes() {
        let json = serde_json::to_value(calibrate(0, 0)).unwrap();
        assert!(json.get("temp_c").is_some());
        assert!(json.get("temp_f").is_some());
        assert!(json.get("humidity_pct").is_some());
    }
}
