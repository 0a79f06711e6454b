//! Protocol error types

use thiserror::Error;

/// Protocol-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Bulk read returned fewer bytes than the counts occupy
    #[error("Report too short: needed {needed} bytes, got {actual}")]
    ReportTooShort { needed: usize, actual: usize },

    /// LED bitmask outside 0..=3
    #[error("Invalid LED state {0} (expected 0-3)")]
    InvalidLedState(u8),
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::ReportTooShort {
            needed: 4,
            actual: 1,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Report too short"));
        assert!(msg.contains("needed 4"));

        let msg = ProtocolError::InvalidLedState(9).to_string();
        assert!(msg.contains('9'));
    }
}
