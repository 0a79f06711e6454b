//! Common error types
//!
//! Every failure the tool can report, with the process exit code it maps to.

use protocol::UsbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("USBRH not found (device #{ordinal})")]
    DeviceNotFound { ordinal: usize },

    #[error("USB bus error: {0}")]
    Usb(UsbError),

    #[error("usb_open error: {0}")]
    Open(UsbError),

    #[error("usb_set_configuration error: {0}")]
    Configure(UsbError),

    #[error("usb_claim_interface error: {0}")]
    Claim(UsbError),

    #[error("usb_release_interface error: {0}")]
    Release(UsbError),

    #[error("Invalid arguments: {0}")]
    Argument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code reported for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::DeviceNotFound { .. }
            | Error::Usb(_)
            | Error::Argument(_)
            | Error::Config(_)
            | Error::Io(_) => 1,
            Error::Open(_) => 2,
            Error::Configure(_) => 3,
            Error::Claim(_) => 4,
            Error::Release(_) => 5,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::DeviceNotFound { ordinal: 2 }.exit_code(), 1);
        assert_eq!(Error::Argument("conflict".into()).exit_code(), 1);
        assert_eq!(Error::Open(UsbError::Access).exit_code(), 2);
        assert_eq!(Error::Configure(UsbError::Busy).exit_code(), 3);
        assert_eq!(Error::Claim(UsbError::Busy).exit_code(), 4);
        assert_eq!(Error::Release(UsbError::NoDevice).exit_code(), 5);
    }

    #[test]
    fn test_error_display() {
        let msg = Error::DeviceNotFound { ordinal: 3 }.to_string();
        assert_eq!(msg, "USBRH not found (device #3)");

        let msg = Error::Claim(UsbError::Busy).to_string();
        assert!(msg.contains("claim"));
        assert!(msg.contains("busy"));
    }
}
