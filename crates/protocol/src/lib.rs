//! Protocol library for usbrh
//!
//! This crate describes the fixed command set of the USB temperature/humidity
//! module: the vendor control requests that drive its LEDs and heater, the
//! measurement trigger, the layout of the 7-byte report returned by the bulk
//! endpoint, and the calibration that turns raw counts into physical units.
//!
//! # Example
//!
//! ```
//! use protocol::{RawReport, Measurement};
//!
//! let report = RawReport([0x12, 0x34, 0x56, 0x78, 0, 0, 0]);
//! let counts = report.decode();
//! assert_eq!(counts.so_rh, 0x1234);
//! assert_eq!(counts.so_t, 0x5678);
//!
//! let m = Measurement::from_report(&report);
//! assert!((m.temp_c - (-40.0 + 0.01 * 22136.0)).abs() < 1e-9);
//! ```

pub mod calibration;
pub mod codec;
pub mod dump;
pub mod error;
pub mod types;

pub use calibration::{CALIBRATION, CalibrationConstants, Measurement, calibrate, calibrate_with};
pub use codec::{RawReport, SensorCounts, decode};
pub use dump::hex_dump;
pub use error::{ProtocolError, Result};
pub use types::{
    HEATER_ON_LEVEL, Led, LedState, PAYLOAD_LEN, PRODUCT_ID, Payload, REPORT_ENDPOINT, REPORT_LEN,
    REQUEST_INDEX, REQUEST_SET_REPORT, REQUEST_TYPE_OUT, SubCommand, UsbError, VALUE_MEASURE,
    VALUE_OUTPUT, VENDOR_ID,
};
