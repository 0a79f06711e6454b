//! Device protocol type definitions
//!
//! This module defines the fixed command set of the sensor module: the USB
//! identifiers, the vendor request layout, the sub-commands carried in the
//! control payload and the transfer error conditions.

use crate::error::ProtocolError;
use thiserror::Error;

/// USB vendor ID of the sensor module
pub const VENDOR_ID: u16 = 0x1774;

/// USB product ID of the sensor module
pub const PRODUCT_ID: u16 = 0x1001;

/// bmRequestType for every command: host-to-device, class, interface
pub const REQUEST_TYPE_OUT: u8 = 0x21;

/// bRequest used for both the output writes and the measurement trigger
pub const REQUEST_SET_REPORT: u8 = 0x09;

/// wValue for LED and heater writes
pub const VALUE_OUTPUT: u16 = 0x0300;

/// wValue for the "begin measurement" trigger
pub const VALUE_MEASURE: u16 = 0x0200;

/// wIndex for every command
pub const REQUEST_INDEX: u16 = 0;

/// Bulk IN endpoint carrying the measurement report (endpoint 1, IN)
pub const REPORT_ENDPOINT: u8 = 0x81;

/// Length of every control payload sent to the device
pub const PAYLOAD_LEN: usize = 7;

/// Length of the measurement report returned by the bulk read
pub const REPORT_LEN: usize = 7;

/// Level byte that switches the heater on
pub const HEATER_ON_LEVEL: u8 = 0x04;

/// Sub-command identifier carried in byte 0 of an output payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SubCommand {
    /// Heating element
    Heater = 1,
    /// Red LED
    RedLed = 3,
    /// Green LED
    GreenLed = 4,
}

/// Which LED an output command addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Led {
    Red,
    Green,
}

impl Led {
    /// Sub-command that drives this LED
    pub fn sub_command(self) -> SubCommand {
        match self {
            Led::Red => SubCommand::RedLed,
            Led::Green => SubCommand::GreenLed,
        }
    }
}

/// Combined red/green LED state, encoded as bit 0 = red, bit 1 = green
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LedState {
    pub red: bool,
    pub green: bool,
}

impl LedState {
    /// Both LEDs off
    pub const OFF: LedState = LedState {
        red: false,
        green: false,
    };

    /// Decode a state from its 0..=3 bitmask form
    pub fn from_bits(bits: u8) -> Result<Self, ProtocolError> {
        if bits > 3 {
            return Err(ProtocolError::InvalidLedState(bits));
        }
        Ok(Self {
            red: bits & 0x1 != 0,
            green: bits & 0x2 != 0,
        })
    }

    /// Encode as the 0..=3 bitmask
    pub fn bits(self) -> u8 {
        u8::from(self.red) | (u8::from(self.green) << 1)
    }
}

/// Fixed-size control payload
///
/// The device always expects seven bytes and ignores trailing zeros, so
/// shorter logical commands are zero-padded here rather than by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Payload([u8; PAYLOAD_LEN]);

impl Payload {
    /// All-zero payload, used for the measurement trigger
    pub const fn zeroed() -> Self {
        Self([0; PAYLOAD_LEN])
    }

    /// Output command: sub-command id followed by its level byte
    pub const fn command(sub: SubCommand, level: u8) -> Self {
        let mut bytes = [0; PAYLOAD_LEN];
        bytes[0] = sub as u8;
        bytes[1] = level;
        Self(bytes)
    }

    /// LED on/off command
    pub fn led(led: Led, on: bool) -> Self {
        Self::command(led.sub_command(), u8::from(on))
    }

    /// Heater on/off command
    pub fn heater(on: bool) -> Self {
        Self::command(SubCommand::Heater, if on { HEATER_ON_LEVEL } else { 0 })
    }

    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// USB transfer error types
///
/// Maps to libusb error codes. See rusb::Error for details.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsbError {
    /// Transfer timed out
    #[error("transfer timed out")]
    Timeout,
    /// Endpoint stalled (protocol error)
    #[error("endpoint stalled")]
    Pipe,
    /// Device was disconnected
    #[error("device disconnected")]
    NoDevice,
    /// Device or endpoint not found
    #[error("entity not found")]
    NotFound,
    /// Device or interface is busy
    #[error("resource busy")]
    Busy,
    /// Buffer overflow
    #[error("overflow")]
    Overflow,
    /// I/O error
    #[error("input/output error")]
    Io,
    /// Invalid parameter
    #[error("invalid parameter")]
    InvalidParam,
    /// Access denied (permissions)
    #[error("access denied")]
    Access,
    /// Fewer bytes moved than the protocol requires
    #[error("short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },
    /// Other error with message
    #[error("{message}")]
    Other { message: String },
}
