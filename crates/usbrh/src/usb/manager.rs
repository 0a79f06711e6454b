//! Device enumeration and selection
//!
//! Every call rescans the bus, so a device plugged in or removed between two
//! invocations is always seen correctly.

use common::{DeviceRef, Error, Result, UsbBus, UsbDevice};
use tracing::debug;

/// Vendor/product pair a device must carry to be considered a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceFilter {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    pub fn matches<D: UsbDevice>(&self, device: &D) -> bool {
        device.vendor_id() == self.vendor_id && device.product_id() == self.product_id
    }
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self::new(protocol::VENDOR_ID, protocol::PRODUCT_ID)
    }
}

/// Bus location of one matching device, as shown by the device listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceListing {
    pub ordinal: usize,
    pub bus_number: u8,
    pub address: u8,
}

/// All matching devices in bus enumeration order, numbered from 1
pub fn enumerate<B: UsbBus>(
    bus: &B,
    filter: DeviceFilter,
) -> Result<impl Iterator<Item = DeviceRef<B::Device>>> {
    let devices = bus.devices().map_err(Error::Usb)?;

    Ok(devices
        .into_iter()
        .filter(move |device| filter.matches(device))
        .enumerate()
        .map(|(i, device)| DeviceRef {
            ordinal: i + 1,
            device,
        }))
}

/// The `ordinal`-th matching device (1-based)
pub fn select<B: UsbBus>(
    bus: &B,
    filter: DeviceFilter,
    ordinal: usize,
) -> Result<DeviceRef<B::Device>> {
    if ordinal == 0 {
        return Err(Error::DeviceNotFound { ordinal });
    }

    let selected = enumerate(bus, filter)?
        .nth(ordinal - 1)
        .ok_or(Error::DeviceNotFound { ordinal })?;

    debug!(
        "USBRH #{} found at bus={:03} device={:03}",
        ordinal,
        selected.device.bus_number(),
        selected.device.address()
    );
    Ok(selected)
}

/// Bus locations of every matching device
pub fn list<B: UsbBus>(bus: &B, filter: DeviceFilter) -> Result<Vec<DeviceListing>> {
    Ok(enumerate(bus, filter)?
        .map(|found| DeviceListing {
            ordinal: found.ordinal,
            bus_number: found.device.bus_number(),
            address: found.device.address(),
        })
        .collect())
}
