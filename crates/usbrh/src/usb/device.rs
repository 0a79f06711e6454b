//! libusb-backed transport
//!
//! Implements the transport traits on top of rusb. Every scan asks libusb for
//! a fresh device list; nothing is cached between calls.

use crate::usb::transfers::map_rusb_error;
use common::{DeviceLayout, UsbBus, UsbDevice, UsbHandle};
use protocol::UsbError;
use rusb::{Context, Device, DeviceDescriptor, DeviceHandle, UsbContext};
use std::time::Duration;
use tracing::debug;

/// USB bus reached through a libusb context
pub struct RusbBus {
    context: Context,
}

impl RusbBus {
    /// Create a new libusb context
    pub fn new() -> Result<Self, UsbError> {
        let context = Context::new().map_err(map_rusb_error)?;
        Ok(Self { context })
    }
}

impl UsbBus for RusbBus {
    type Device = RusbDevice;
    type Handle = RusbHandle;

    fn devices(&self) -> Result<Vec<RusbDevice>, UsbError> {
        let devices = self.context.devices().map_err(map_rusb_error)?;

        let found: Vec<RusbDevice> = devices
            .iter()
            .filter_map(|device| match device.device_descriptor() {
                Ok(descriptor) => Some(RusbDevice { device, descriptor }),
                Err(e) => {
                    debug!(
                        "Skipping device bus={} addr={}: {}",
                        device.bus_number(),
                        device.address(),
                        e
                    );
                    None
                }
            })
            .collect();

        debug!("Enumerated {} devices", found.len());
        Ok(found)
    }

    fn open(&self, device: &RusbDevice) -> Result<RusbHandle, UsbError> {
        let handle = device.device.open().map_err(map_rusb_error)?;
        debug!(
            "Opened device bus={:03} addr={:03}",
            device.bus_number(),
            device.address()
        );
        Ok(RusbHandle { handle })
    }
}

/// USB device wrapper with its cached device descriptor
pub struct RusbDevice {
    device: Device<Context>,
    descriptor: DeviceDescriptor,
}

impl UsbDevice for RusbDevice {
    fn vendor_id(&self) -> u16 {
        self.descriptor.vendor_id()
    }

    fn product_id(&self) -> u16 {
        self.descriptor.product_id()
    }

    fn bus_number(&self) -> u8 {
        self.device.bus_number()
    }

    fn address(&self) -> u8 {
        self.device.address()
    }

    fn layout(&self) -> Result<DeviceLayout, UsbError> {
        let config = self.device.config_descriptor(0).map_err(map_rusb_error)?;

        let interface = config
            .interfaces()
            .next()
            .and_then(|interface| interface.descriptors().next())
            .map(|descriptor| descriptor.interface_number())
            .ok_or(UsbError::NotFound)?;

        Ok(DeviceLayout {
            configuration: config.number(),
            interface,
        })
    }
}

/// Open libusb handle; closed when dropped
pub struct RusbHandle {
    handle: DeviceHandle<Context>,
}

impl UsbHandle for RusbHandle {
    fn set_active_configuration(&mut self, configuration: u8) -> Result<(), UsbError> {
        self.handle
            .set_active_configuration(configuration)
            .map_err(map_rusb_error)
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> Result<(), UsbError> {
        self.handle
            .detach_kernel_driver(interface)
            .map_err(map_rusb_error)
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), UsbError> {
        self.handle
            .claim_interface(interface)
            .map_err(map_rusb_error)
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), UsbError> {
        self.handle
            .release_interface(interface)
            .map_err(map_rusb_error)
    }

    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, UsbError> {
        self.handle
            .write_control(request_type, request, value, index, data, timeout)
            .map_err(map_rusb_error)
    }

    fn read_bulk(
        &mut self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, UsbError> {
        self.handle
            .read_bulk(endpoint, buf, timeout)
            .map_err(map_rusb_error)
    }
}

impl Drop for RusbHandle {
    fn drop(&mut self) {
        debug!("Closing device handle");
    }
}
