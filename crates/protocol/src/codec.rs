//! Measurement report decoding
//!
//! The bulk read returns a fixed seven byte report:
//! ```text
//! [SO_RH: u16 (big-endian)][SO_T: u16 (big-endian)][3 unused bytes]
//! ```

use crate::error::{ProtocolError, Result};
use crate::types::REPORT_LEN;
use byteorder::{BigEndian, ByteOrder};

/// Bytes of the report actually consumed by decoding
pub const REPORT_PAYLOAD_LEN: usize = 4;

/// Raw 7-byte measurement report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawReport(pub [u8; REPORT_LEN]);

/// Raw sensor counts before calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorCounts {
    /// Relative humidity count (SO_RH)
    pub so_rh: u16,
    /// Temperature count (SO_T)
    pub so_t: u16,
}

impl RawReport {
    /// Build a report from the bytes returned by a bulk read
    ///
    /// Reads shorter than the report are zero-filled as long as both counts
    /// are present; anything shorter is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < REPORT_PAYLOAD_LEN {
            return Err(ProtocolError::ReportTooShort {
                needed: REPORT_PAYLOAD_LEN,
                actual: bytes.len(),
            });
        }

        let mut report = [0u8; REPORT_LEN];
        let len = bytes.len().min(REPORT_LEN);
        report[..len].copy_from_slice(&bytes[..len]);
        Ok(Self(report))
    }

    /// Encode counts into a report with the trailing bytes zeroed
    pub fn encode(counts: SensorCounts) -> Self {
        let mut report = [0u8; REPORT_LEN];
        BigEndian::write_u16(&mut report[0..2], counts.so_rh);
        BigEndian::write_u16(&mut report[2..4], counts.so_t);
        Self(report)
    }

    /// Split the report into its humidity and temperature counts
    pub fn decode(&self) -> SensorCounts {
        decode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; REPORT_LEN] {
        &self.0
    }
}

/// Decode humidity and temperature counts from a full report
pub fn decode(raw: &[u8; REPORT_LEN]) -> SensorCounts {
    SensorCounts {
        so_rh: BigEndian::read_u16(&raw[0..2]),
        so_t: BigEndian::read_u16(&raw[2..4]),
    }
}
