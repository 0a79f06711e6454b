//! usbrh
//!
//! Reads the USBRH temperature/humidity module and drives its LEDs and heater.
//! The binary is a thin shell over [`cli`], [`commands`] and [`format`]; the
//! libusb transport lives in [`usb`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod format;
pub mod usb;
