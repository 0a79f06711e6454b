//! USB subsystem
//!
//! Handles everything between the process and the sensor module:
//! - Device enumeration and selection by ordinal
//! - Session setup (configuration, interface claim with kernel driver fallback)
//! - Control and bulk transfer execution
//!
//! All operations are synchronous and block the calling thread up to their
//! timeout. The device speaks one transfer at a time.

pub mod device;
pub mod manager;
pub mod session;
pub mod transfers;

// Re-export public types
pub use device::RusbBus;
pub use manager::{DeviceFilter, DeviceListing};
pub use session::{Session, open_session, with_session};
