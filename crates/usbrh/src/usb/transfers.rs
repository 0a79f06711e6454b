//! USB transfer execution
//!
//! Synchronous control and bulk transfers against an open handle. Every
//! payload moved is written to the debug trace as a hex dump. Failures are
//! returned to the caller without retry.

use common::UsbHandle;
use protocol::{
    PAYLOAD_LEN, Payload, REQUEST_INDEX, REQUEST_SET_REPORT, REQUEST_TYPE_OUT, UsbError,
    VALUE_OUTPUT, hex_dump,
};
use std::time::Duration;
use tracing::debug;

/// Default timeout for USB transfers (5 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Send a class control request carrying a fixed 7-byte payload
///
/// Writing fewer bytes than the payload holds is reported as a short transfer.
pub fn control_transfer<H: UsbHandle>(
    handle: &mut H,
    request: u8,
    value: u16,
    payload: &Payload,
    timeout: Duration,
) -> Result<usize, UsbError> {
    debug!(
        "Control transfer: request_type={:#x}, request={:#x}, value={:#06x}, index={:#x}, len={}",
        REQUEST_TYPE_OUT, request, value, REQUEST_INDEX, PAYLOAD_LEN
    );

    let written = handle
        .write_control(
            REQUEST_TYPE_OUT,
            request,
            value,
            REQUEST_INDEX,
            payload.as_ref(),
            timeout,
        )
        .inspect_err(|e| debug!("usb_control_msg error: {}", e))?;

    debug!("usb_control_msg OK: sent {} bytes", written);
    trace_dump(&payload.as_ref()[..written.min(PAYLOAD_LEN)]);

    if written < PAYLOAD_LEN {
        return Err(UsbError::ShortTransfer {
            expected: PAYLOAD_LEN,
            actual: written,
        });
    }
    Ok(written)
}

/// Send an LED or heater output command
pub fn write_output<H: UsbHandle>(
    handle: &mut H,
    payload: &Payload,
    timeout: Duration,
) -> Result<usize, UsbError> {
    control_transfer(handle, REQUEST_SET_REPORT, VALUE_OUTPUT, payload, timeout)
}

/// Read up to `length` bytes from a bulk IN endpoint
pub fn bulk_read<H: UsbHandle>(
    handle: &mut H,
    endpoint: u8,
    length: usize,
    timeout: Duration,
) -> Result<Vec<u8>, UsbError> {
    debug!(
        "Bulk transfer: endpoint={:#x}, len={}, timeout={}ms",
        endpoint,
        length,
        timeout.as_millis()
    );

    let mut buffer = vec![0u8; length];
    let read = handle
        .read_bulk(endpoint, &mut buffer, timeout)
        .inspect_err(|e| debug!("usb_bulk_read error: {}", e))?;
    buffer.truncate(read);

    debug!("usb_bulk_read: {} bytes read", read);
    trace_dump(&buffer);
    Ok(buffer)
}

fn trace_dump(bytes: &[u8]) {
    for line in hex_dump(bytes) {
        debug!("{}", line);
    }
}

/// Map rusb::Error to protocol::UsbError
pub fn map_rusb_error(err: rusb::Error) -> UsbError {
    match err {
        rusb::Error::Timeout => UsbError::Timeout,
        rusb::Error::Pipe => UsbError::Pipe,
        rusb::Error::NoDevice => UsbError::NoDevice,
        rusb::Error::NotFound => UsbError::NotFound,
        rusb::Error::Busy => UsbError::Busy,
        rusb::Error::Overflow => UsbError::Overflow,
        rusb::Error::Io => UsbError::Io,
        rusb::Error::InvalidParam => UsbError::InvalidParam,
        rusb::Error::Access => UsbError::Access,
        _ => UsbError::Other {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UsbBus;
    use common::test_utils::{MockBehavior, MockBus, Op};
    use protocol::{Led, REPORT_ENDPOINT, VALUE_MEASURE};

    fn open(bus: &MockBus) -> common::test_utils::MockHandle {
        let device = bus.devices().unwrap().remove(1);
        bus.open(&device).unwrap()
    }

    #[test]
    fn test_map_rusb_error() {
        assert_eq!(map_rusb_error(rusb::Error::Timeout), UsbError::Timeout);
        assert_eq!(map_rusb_error(rusb::Error::Pipe), UsbError::Pipe);
        assert_eq!(map_rusb_error(rusb::Error::NoDevice), UsbError::NoDevice);
        assert_eq!(map_rusb_error(rusb::Error::NotFound), UsbError::NotFound);
        assert_eq!(map_rusb_error(rusb::Error::Access), UsbError::Access);
        assert!(matches!(
            map_rusb_error(rusb::Error::Other),
            UsbError::Other { .. }
        ));
    }

    #[test]
    fn test_control_transfer_sends_full_payload() {
        let bus = MockBus::with_sensors(1);
        let mut handle = open(&bus);

        let sent = control_transfer(
            &mut handle,
            REQUEST_SET_REPORT,
            VALUE_MEASURE,
            &Payload::zeroed(),
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        assert_eq!(sent, PAYLOAD_LEN);

        let ops = bus.ops();
        assert_eq!(
            ops[1],
            Op::Control {
                request_type: 0x21,
                request: 0x09,
                value: 0x0200,
                index: 0,
                data: vec![0; 7],
            }
        );
    }

    #[test]
    fn test_write_output_uses_output_value() {
        let bus = MockBus::with_sensors(1);
        let mut handle = open(&bus);

        write_output(&mut handle, &Payload::led(Led::Red, true), DEFAULT_TIMEOUT).unwrap();

        match &bus.ops()[1] {
            Op::Control { value, data, .. } => {
                assert_eq!(*value, 0x0300);
                assert_eq!(data, &vec![3, 1, 0, 0, 0, 0, 0]);
            }
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_short_control_write_is_an_error() {
        let bus = MockBus::with_sensors(1).with_behavior(MockBehavior {
            short_control_write: Some(3),
            ..Default::default()
        });
        let mut handle = open(&bus);

        let err = write_output(&mut handle, &Payload::heater(false), DEFAULT_TIMEOUT).unwrap_err();
        assert_eq!(
            err,
            UsbError::ShortTransfer {
                expected: 7,
                actual: 3
            }
        );
    }

    #[test]
    fn test_bulk_read_truncates_to_received() {
        let bus = MockBus::with_sensors(1).with_behavior(MockBehavior {
            bulk_response: Ok(vec![0x28, 0x9a, 0x37, 0x12]),
            ..Default::default()
        });
        let mut handle = open(&bus);

        let data = bulk_read(&mut handle, REPORT_ENDPOINT, 7, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(data, vec![0x28, 0x9a, 0x37, 0x12]);
        assert_eq!(
            bus.ops()[1],
            Op::BulkRead {
                endpoint: 0x81,
                len: 7
            }
        );
    }

    #[test]
    fn test_bulk_read_error_propagates() {
        let bus = MockBus::with_sensors(1).with_behavior(MockBehavior {
            bulk_response: Err(UsbError::Timeout),
            ..Default::default()
        });
        let mut handle = open(&bus);

        let err = bulk_read(&mut handle, REPORT_ENDPOINT, 7, DEFAULT_TIMEOUT).unwrap_err();
        assert_eq!(err, UsbError::Timeout);
    }
}
