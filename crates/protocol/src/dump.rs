//! Hex dump formatting for the debug trace
//!
//! Sixteen bytes per line, split into two groups of eight by a `-`:
//! ```text
//! 00 01 02 03 04 05 06 07-08 09 0a 0b 0c 0d 0e 0f
//! ```

use std::fmt::Write;

const BYTES_PER_LINE: usize = 16;
const BYTES_PER_GROUP: usize = 8;

/// Format bytes as dump lines
pub fn hex_dump(bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(BYTES_PER_LINE)
        .map(|chunk| {
            let mut line = String::with_capacity(BYTES_PER_LINE * 3);
            for (i, byte) in chunk.iter().enumerate() {
                if i > 0 {
                    line.push(if i == BYTES_PER_GROUP { '-' } else { ' ' });
                }
                let _ = write!(line, "{:02x}", byte);
            }
            line
        })
        .collect()
}
