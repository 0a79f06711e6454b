//! Sensor calibration
//!
//! Converts raw SO_T / SO_RH counts into physical units with the fixed linear
//! model of the SHT1x sensor fitted to the module (12-bit humidity, 14-bit
//! temperature, 5V supply).

use crate::codec::{RawReport, SensorCounts};
use serde::Serialize;

/// Calibration coefficients of the sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationConstants {
    pub d1: f64,
    pub d2_c: f64,
    pub d2_f: f64,
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub t1: f64,
    pub t2: f64,
}

/// Coefficients used for every conversion
pub const CALIBRATION: CalibrationConstants = CalibrationConstants {
    d1: -40.00,
    d2_c: 0.01,
    d2_f: 0.018,
    c1: -4.0,
    c2: 0.0405,
    c3: -0.0000028,
    t1: 0.01,
    t2: 0.00008,
};

/// Calibrated reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    /// Temperature in degrees Celsius
    pub temp_c: f64,
    /// Temperature in degrees Fahrenheit
    pub temp_f: f64,
    /// Temperature-compensated relative humidity in percent
    pub humidity_pct: f64,
}

impl Measurement {
    /// Reading reported when the device could not be read
    pub const ZERO: Measurement = Measurement {
        temp_c: 0.0,
        temp_f: 0.0,
        humidity_pct: 0.0,
    };

    /// Decode and calibrate a raw report
    pub fn from_report(report: &RawReport) -> Self {
        let SensorCounts { so_rh, so_t } = report.decode();
        calibrate(so_t, so_rh)
    }
}

/// Apply the calibration model to raw counts
pub fn calibrate(so_t: u16, so_rh: u16) -> Measurement {
    calibrate_with(&CALIBRATION, so_t, so_rh)
}

/// Apply an explicit set of coefficients to raw counts
pub fn calibrate_with(k: &CalibrationConstants, so_t: u16, so_rh: u16) -> Measurement {
    let so_t = f64::from(so_t);
    let so_rh = f64::from(so_rh);

    let rh_linear = k.c1 + k.c2 * so_rh + k.c3 * so_rh * so_rh;
    let temp_c = k.d1 + k.d2_c * so_t;
    let temp_f = k.d1 + k.d2_f * so_t;
    let humidity_pct = (temp_c - 25.0) * (k.t1 + k.t2 * so_rh) + rh_linear;

    Measurement {
        temp_c,
        temp_f,
        humidity_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_calibrate_zero_counts() {
        let m = calibrate(0, 0);
        assert!((m.temp_c - -40.0).abs() < EPSILON);
        assert!((m.temp_f - -40.0).abs() < EPSILON);
        assert!((m.humidity_pct - -4.65).abs() < EPSILON);
    }

    #[test]
    fn test_calibrate_room_temperature() {
        // 6500 counts -> 25.00 C, where the compensation term vanishes
        let m = calibrate(6500, 1000);
        assert!((m.temp_c - 25.0).abs() < EPSILON);
        let rh_linear = -4.0 + 0.0405 * 1000.0 - 0.0000028 * 1000.0 * 1000.0;
        assert!((m.humidity_pct - rh_linear).abs() < EPSILON);
    }

    #[test]
    fn test_measurement_from_report() {
        let report = RawReport([0x28, 0x9A, 0x37, 0x12, 0, 0, 0]);
        assert_eq!(Measurement::from_report(&report), calibrate(0x3712, 0x289A));
    }

    #[test]
    fn test_zero_measurement() {
        assert_eq!(Measurement::ZERO.temp_c, 0.0);
        assert_eq!(Measurement::ZERO.temp_f, 0.0);
        assert_eq!(Measurement::ZERO.humidity_pct, 0.0);
    }
}
