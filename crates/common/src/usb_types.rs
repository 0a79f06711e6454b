//! USB transport abstractions
//!
//! The tool talks to libusb through these traits so that the session and
//! command logic can run against the simulated bus in `test_utils`.

use protocol::UsbError;
use std::time::Duration;

/// Configuration value and interface number the sensor declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLayout {
    pub configuration: u8,
    pub interface: u8,
}

/// One device found during a bus scan
pub trait UsbDevice {
    fn vendor_id(&self) -> u16;
    fn product_id(&self) -> u16;
    fn bus_number(&self) -> u8;
    fn address(&self) -> u8;

    /// Read the first configuration and interface from the descriptors
    fn layout(&self) -> Result<DeviceLayout, UsbError>;
}

/// An open device handle
///
/// Dropping the handle closes it.
pub trait UsbHandle {
    fn set_active_configuration(&mut self, configuration: u8) -> Result<(), UsbError>;
    fn detach_kernel_driver(&mut self, interface: u8) -> Result<(), UsbError>;
    fn claim_interface(&mut self, interface: u8) -> Result<(), UsbError>;
    fn release_interface(&mut self, interface: u8) -> Result<(), UsbError>;

    /// Host-to-device control transfer, returns the number of bytes written
    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, UsbError>;

    /// Bulk IN transfer, returns the number of bytes read into `buf`
    fn read_bulk(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration)
    -> Result<usize, UsbError>;
}

/// Access to the USB bus
pub trait UsbBus {
    type Device: UsbDevice;
    type Handle: UsbHandle;

    /// Rescan the bus and return every attached device in enumeration order
    fn devices(&self) -> Result<Vec<Self::Device>, UsbError>;

    fn open(&self, device: &Self::Device) -> Result<Self::Handle, UsbError>;
}

/// A matching device together with its 1-based position among all matches
#[derive(Debug, Clone)]
pub struct DeviceRef<D> {
    pub ordinal: usize,
    pub device: D,
}

/// Blocking wait between protocol steps
pub trait Delay {
    fn delay(&mut self, duration: Duration);
}

/// Delay backed by `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
