//! Common utilities for usbrh
//!
//! This crate provides the pieces shared between the sensor tool and its
//! tests: the error taxonomy with its exit codes, logging setup, the USB
//! transport traits that isolate libusb, and a simulated bus for tests.

pub mod error;
pub mod logging;
pub mod test_utils;
pub mod usb_types;

pub use error::{Error, Result};
pub use logging::{build_filter, setup_logging};
pub use usb_types::{Delay, DeviceLayout, DeviceRef, ThreadDelay, UsbBus, UsbDevice, UsbHandle};
