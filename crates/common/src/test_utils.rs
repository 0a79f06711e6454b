//! Test utilities for usbrh
//!
//! Provides a simulated USB bus that records every operation issued against
//! it, so session and command sequences can be asserted as an ordered log.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{MockBus, Op};
//! use common::UsbBus;
//!
//! let bus = MockBus::with_sensors(2);
//! let devices = bus.devices().unwrap();
//! let handle = bus.open(&devices[0]).unwrap();
//! drop(handle);
//!
//! let ops = bus.ops();
//! assert!(matches!(ops[0], Op::Open { .. }));
//! assert_eq!(ops[1], Op::Close);
//! ```

use crate::usb_types::{Delay, DeviceLayout, UsbBus, UsbDevice, UsbHandle};
use protocol::{PRODUCT_ID, UsbError, VENDOR_ID};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Configuration value reported by simulated sensors
pub const MOCK_CONFIGURATION: u8 = 1;

/// Interface number reported by simulated sensors
pub const MOCK_INTERFACE: u8 = 0;

/// One recorded bus operation
///
/// Failed attempts are recorded as well as successful ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Open { bus: u8, address: u8 },
    SetConfiguration(u8),
    DetachKernelDriver(u8),
    ClaimInterface(u8),
    ReleaseInterface(u8),
    Control {
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: Vec<u8>,
    },
    BulkRead { endpoint: u8, len: usize },
    Delay(Duration),
    Close,
}

/// Shared, ordered record of operations
pub type OpLog = Rc<RefCell<Vec<Op>>>;

/// Outcomes the simulated device produces
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub scan_error: Option<UsbError>,
    pub open_error: Option<UsbError>,
    pub layout_error: Option<UsbError>,
    pub configure_error: Option<UsbError>,
    pub detach_error: Option<UsbError>,
    /// Number of leading claim attempts that fail with `Busy`
    pub claim_failures: usize,
    pub release_error: Option<UsbError>,
    /// Control transfers with a matching (value, payload byte 0) fail
    pub control_errors: Vec<(u16, u8, UsbError)>,
    /// Control transfers report this many bytes written instead of the full payload
    pub short_control_write: Option<usize>,
    pub bulk_response: Result<Vec<u8>, UsbError>,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            scan_error: None,
            open_error: None,
            layout_error: None,
            configure_error: None,
            detach_error: None,
            claim_failures: 0,
            release_error: None,
            control_errors: Vec::new(),
            short_control_write: None,
            bulk_response: Ok(vec![0; protocol::REPORT_LEN]),
        }
    }
}

/// Simulated device entry on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDevice {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus_number: u8,
    pub address: u8,
    layout_error: Option<UsbError>,
}

impl MockDevice {
    pub fn new(vendor_id: u16, product_id: u16, bus_number: u8, address: u8) -> Self {
        Self {
            vendor_id,
            product_id,
            bus_number,
            address,
            layout_error: None,
        }
    }

    /// A device with the sensor's identifiers
    pub fn sensor(bus_number: u8, address: u8) -> Self {
        Self::new(VENDOR_ID, PRODUCT_ID, bus_number, address)
    }
}

impl UsbDevice for MockDevice {
    fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    fn product_id(&self) -> u16 {
        self.product_id
    }

    fn bus_number(&self) -> u8 {
        self.bus_number
    }

    fn address(&self) -> u8 {
        self.address
    }

    fn layout(&self) -> Result<DeviceLayout, UsbError> {
        match &self.layout_error {
            Some(e) => Err(e.clone()),
            None => Ok(DeviceLayout {
                configuration: MOCK_CONFIGURATION,
                interface: MOCK_INTERFACE,
            }),
        }
    }
}

/// Simulated bus
#[derive(Debug, Clone)]
pub struct MockBus {
    devices: Vec<MockDevice>,
    behavior: Rc<RefCell<MockBehavior>>,
    log: OpLog,
}

impl MockBus {
    pub fn new(devices: Vec<MockDevice>) -> Self {
        Self {
            devices,
            behavior: Rc::new(RefCell::new(MockBehavior::default())),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A bus with `count` sensors, each preceded by an unrelated device
    pub fn with_sensors(count: usize) -> Self {
        let devices = (0..count)
            .flat_map(|i| {
                let address = (i as u8) * 2 + 1;
                [
                    MockDevice::new(0x046d, 0xc52b, 1, address),
                    MockDevice::sensor(1, address + 1),
                ]
            })
            .collect();
        Self::new(devices)
    }

    pub fn with_behavior(self, behavior: MockBehavior) -> Self {
        *self.behavior.borrow_mut() = behavior;
        self
    }

    /// Change the outcomes of subsequent operations
    pub fn update_behavior(&self, f: impl FnOnce(&mut MockBehavior)) {
        f(&mut self.behavior.borrow_mut());
    }

    /// Shared handle on the operation log
    pub fn log(&self) -> OpLog {
        Rc::clone(&self.log)
    }

    /// Snapshot of the operations recorded so far
    pub fn ops(&self) -> Vec<Op> {
        self.log.borrow().clone()
    }

    /// Delay that records into this bus's log instead of sleeping
    pub fn delay(&self) -> MockDelay {
        MockDelay {
            log: self.log(),
        }
    }
}

impl UsbBus for MockBus {
    type Device = MockDevice;
    type Handle = MockHandle;

    fn devices(&self) -> Result<Vec<MockDevice>, UsbError> {
        let behavior = self.behavior.borrow();
        if let Some(e) = &behavior.scan_error {
            return Err(e.clone());
        }
        Ok(self
            .devices
            .iter()
            .cloned()
            .map(|mut d| {
                d.layout_error = behavior.layout_error.clone();
                d
            })
            .collect())
    }

    fn open(&self, device: &MockDevice) -> Result<MockHandle, UsbError> {
        self.log.borrow_mut().push(Op::Open {
            bus: device.bus_number,
            address: device.address,
        });
        if let Some(e) = &self.behavior.borrow().open_error {
            return Err(e.clone());
        }
        Ok(MockHandle {
            behavior: Rc::clone(&self.behavior),
            log: self.log(),
            claim_attempts: 0,
        })
    }
}

/// Simulated open handle; records `Op::Close` when dropped
#[derive(Debug)]
pub struct MockHandle {
    behavior: Rc<RefCell<MockBehavior>>,
    log: OpLog,
    claim_attempts: usize,
}

impl MockHandle {
    fn record(&self, op: Op) {
        self.log.borrow_mut().push(op);
    }

    fn outcome(error: &Option<UsbError>) -> Result<(), UsbError> {
        match error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl UsbHandle for MockHandle {
    fn set_active_configuration(&mut self, configuration: u8) -> Result<(), UsbError> {
        self.record(Op::SetConfiguration(configuration));
        Self::outcome(&self.behavior.borrow().configure_error)
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> Result<(), UsbError> {
        self.record(Op::DetachKernelDriver(interface));
        Self::outcome(&self.behavior.borrow().detach_error)
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), UsbError> {
        self.record(Op::ClaimInterface(interface));
        self.claim_attempts += 1;
        if self.claim_attempts <= self.behavior.borrow().claim_failures {
            return Err(UsbError::Busy);
        }
        Ok(())
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), UsbError> {
        self.record(Op::ReleaseInterface(interface));
        Self::outcome(&self.behavior.borrow().release_error)
    }

    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<usize, UsbError> {
        self.record(Op::Control {
            request_type,
            request,
            value,
            index,
            data: data.to_vec(),
        });

        let behavior = self.behavior.borrow();
        let sub_command = data.first().copied().unwrap_or(0);
        if let Some((_, _, e)) = behavior
            .control_errors
            .iter()
            .find(|(v, sub, _)| *v == value && *sub == sub_command)
        {
            return Err(e.clone());
        }
        Ok(behavior.short_control_write.unwrap_or(data.len()))
    }

    fn read_bulk(
        &mut self,
        endpoint: u8,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, UsbError> {
        self.record(Op::BulkRead {
            endpoint,
            len: buf.len(),
        });

        match &self.behavior.borrow().bulk_response {
            Ok(bytes) => {
                let len = bytes.len().min(buf.len());
                buf[..len].copy_from_slice(&bytes[..len]);
                Ok(len)
            }
            Err(e) => Err(e.clone()),
        }
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.record(Op::Close);
    }
}

/// Delay that records the requested duration and returns immediately
#[derive(Debug, Clone)]
pub struct MockDelay {
    log: OpLog,
}

impl Delay for MockDelay {
    fn delay(&mut self, duration: Duration) {
        self.log.borrow_mut().push(Op::Delay(duration));
    }
}

/// Sum of every recorded delay
pub fn total_delay(ops: &[Op]) -> Duration {
    ops.iter()
        .filter_map(|op| match op {
            Op::Delay(d) => Some(*d),
            _ => None,
        })
        .sum()
}

/// Payloads of every recorded control transfer, in order
pub fn control_payloads(ops: &[Op]) -> Vec<(u16, Vec<u8>)> {
    ops.iter()
        .filter_map(|op| match op {
            Op::Control { value, data, .. } => Some((*value, data.clone())),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_sensors_interleaves_other_devices() {
        let bus = MockBus::with_sensors(3);
        let devices = bus.devices().unwrap();

        assert_eq!(devices.len(), 6);
        let sensors = devices
            .iter()
            .filter(|d| d.vendor_id == VENDOR_ID && d.product_id == PRODUCT_ID)
            .count();
        assert_eq!(sensors, 3);
    }

    #[test]
    fn test_open_and_close_are_recorded() {
        let bus = MockBus::with_sensors(1);
        let device = bus.devices().unwrap().remove(1);
        let handle = bus.open(&device).unwrap();
        drop(handle);

        assert_eq!(
            bus.ops(),
            vec![
                Op::Open {
                    bus: 1,
                    address: 2
                },
                Op::Close
            ]
        );
    }

    #[test]
    fn test_failed_open_records_no_close() {
        let bus = MockBus::with_sensors(1).with_behavior(MockBehavior {
            open_error: Some(UsbError::Access),
            ..Default::default()
        });
        let device = bus.devices().unwrap().remove(1);

        assert_eq!(bus.open(&device).unwrap_err(), UsbError::Access);
        assert_eq!(bus.ops().len(), 1);
    }

    #[test]
    fn test_claim_failures_then_success() {
        let bus = MockBus::with_sensors(1).with_behavior(MockBehavior {
            claim_failures: 1,
            ..Default::default()
        });
        let device = bus.devices().unwrap().remove(1);
        let mut handle = bus.open(&device).unwrap();

        assert_eq!(handle.claim_interface(0), Err(UsbError::Busy));
        assert_eq!(handle.claim_interface(0), Ok(()));
    }

    #[test]
    fn test_bulk_response_is_copied() {
        let bus = MockBus::with_sensors(1).with_behavior(MockBehavior {
            bulk_response: Ok(vec![1, 2, 3]),
            ..Default::default()
        });
        let device = bus.devices().unwrap().remove(1);
        let mut handle = bus.open(&device).unwrap();

        let mut buf = [0u8; 7];
        let n = handle
            .read_bulk(0x81, &mut buf, Duration::from_secs(1))
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(buf, [1, 2, 3, 0, 0, 0, 0]);
    }

    #[test]
    fn test_mock_delay_records() {
        let bus = MockBus::with_sensors(0);
        let mut delay = bus.delay();
        delay.delay(Duration::from_millis(500));
        delay.delay(Duration::from_secs(1));

        assert_eq!(total_delay(&bus.ops()), Duration::from_millis(1500));
    }
}
