//! Command sequencing
//!
//! Each invocation runs exactly one command against one session. The
//! measurement, LED and heater commands are fixed, ordered series of control
//! and bulk transfers with the delays the device needs between them.

use crate::format::OutputMode;
use crate::usb::manager::{self, DeviceFilter, DeviceListing};
use crate::usb::session::with_session;
use crate::usb::transfers::{DEFAULT_TIMEOUT, bulk_read, control_transfer, write_output};
use common::{Delay, Error, Result, UsbBus, UsbHandle};
use protocol::{
    Led, LedState, Measurement, Payload, ProtocolError, REPORT_ENDPOINT, REPORT_LEN,
    REQUEST_SET_REPORT, RawReport, UsbError, VALUE_MEASURE,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest heater cycle accepted
pub const MAX_HEATER_SECONDS: u8 = 60;

/// Sensor conversion time between the trigger and the report read
pub const CONVERSION_DELAY: Duration = Duration::from_secs(1);

/// How long an LED stays lit during the self-test
pub const LED_HOLD: Duration = Duration::from_secs(1);

/// Dark gap between two blinks of the same LED during the self-test
pub const LED_BLINK_GAP: Duration = Duration::from_millis(500);

const LED_TEST_GROUPS: [&[Led]; 3] = [&[Led::Red], &[Led::Green], &[Led::Red, Led::Green]];

/// What the invocation should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Read temperature and humidity, rendered in the given mode
    Measure(OutputMode),
    /// List matching devices without opening any of them
    ListDevices,
    /// Blink the LEDs through the fixed self-test pattern
    LedTest,
    /// Switch the red and green LEDs to a fixed state
    LedSet(LedState),
    /// Run the heater for the given number of seconds, then switch it off
    Heater { seconds: u8 },
}

/// Parsed request handed over by the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: Command,
    /// 1-based ordinal of the device among all matching devices
    pub device_index: usize,
    /// Suppress the status LEDs during measurement and heating
    pub silent: bool,
    /// Dump every transfer to the debug trace
    pub debug: bool,
}

impl CommandRequest {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            device_index: 1,
            silent: false,
            debug: false,
        }
    }

    /// Rendering mode of a measurement request, plain for anything else
    pub fn output_mode(&self) -> OutputMode {
        match self.command {
            Command::Measure(mode) => mode,
            _ => OutputMode::Plain,
        }
    }
}

/// Result handed back for display
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Measurement(Measurement),
    Devices(Vec<DeviceListing>),
    /// An LED or heater sequence ran to the end
    ///
    /// Rejected output commands are logged and counted but do not fail the
    /// run; the device keeps whatever state it reached.
    Completed { failed_outputs: usize },
}

impl CommandOutcome {
    fn completed(failed_outputs: usize) -> Self {
        if failed_outputs > 0 {
            warn!("{} output command(s) failed", failed_outputs);
        }
        CommandOutcome::Completed { failed_outputs }
    }
}

/// Device selection and transfer settings for a run
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub filter: DeviceFilter,
    pub timeout: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            filter: DeviceFilter::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Execute one request end to end
///
/// `report` receives the outcome while the session is still open, so a
/// reading is rendered even when releasing the interface fails afterwards.
pub fn run<B, D, F>(
    bus: &B,
    request: &CommandRequest,
    settings: &RunSettings,
    delay: &mut D,
    mut report: F,
) -> Result<()>
where
    B: UsbBus,
    D: Delay,
    F: FnMut(&CommandOutcome) -> Result<()>,
{
    if request.command == Command::ListDevices {
        let devices = manager::list(bus, settings.filter)?;
        return report(&CommandOutcome::Devices(devices));
    }

    let device = manager::select(bus, settings.filter, request.device_index)?;
    with_session(bus, &device, |session| {
        let mut sequencer =
            Sequencer::new(session.handle_mut(), delay, settings.timeout, request.silent);
        let outcome = sequencer.execute(&request.command)?;
        report(&outcome)
    })
}

/// Runs command sequences over an open handle
pub struct Sequencer<'a, H: UsbHandle, D: Delay> {
    handle: &'a mut H,
    delay: &'a mut D,
    timeout: Duration,
    silent: bool,
}

impl<'a, H: UsbHandle, D: Delay> Sequencer<'a, H, D> {
    pub fn new(handle: &'a mut H, delay: &'a mut D, timeout: Duration, silent: bool) -> Self {
        Self {
            handle,
            delay,
            timeout,
            silent,
        }
    }

    pub fn execute(&mut self, command: &Command) -> Result<CommandOutcome> {
        match command {
            Command::Measure(_) => Ok(CommandOutcome::Measurement(self.measure())),
            Command::LedTest => Ok(CommandOutcome::completed(self.led_test())),
            Command::LedSet(state) => Ok(CommandOutcome::completed(self.set_leds(*state))),
            Command::Heater { seconds } => Ok(CommandOutcome::completed(self.heater(*seconds))),
            Command::ListDevices => Err(Error::Argument(
                "device listing does not run inside a session".to_string(),
            )),
        }
    }

    /// Trigger a conversion and read the report
    ///
    /// A failed transfer yields [`Measurement::ZERO`] instead of an error so
    /// that polling output always carries two numbers. The failure is only
    /// visible on the debug trace.
    pub fn measure(&mut self) -> Measurement {
        if !self.silent {
            self.indicator(Led::Green, true);
        }

        let report = self.read_report();

        if !self.silent {
            self.indicator(Led::Green, false);
        }

        match report {
            Ok(report) => {
                let counts = report.decode();
                let bytes = report.as_bytes();
                debug!(
                    "convert to integer(temperature): [{:02x} {:02x}] -> [{:04x}]",
                    bytes[2], bytes[3], counts.so_t
                );
                debug!(
                    "convert to integer(humidity): [{:02x} {:02x}] -> [{:04x}]",
                    bytes[0], bytes[1], counts.so_rh
                );
                Measurement::from_report(&report)
            }
            Err(e) => {
                debug!("Measurement failed, reporting a zero reading: {}", e);
                Measurement::ZERO
            }
        }
    }

    /// Blink red, then green, then both
    ///
    /// Returns the number of output commands the device rejected.
    pub fn led_test(&mut self) -> usize {
        info!("Running LED self-test");
        let mut failed = 0;

        for (i, leds) in LED_TEST_GROUPS.iter().enumerate() {
            let last = i + 1 == LED_TEST_GROUPS.len();

            failed += self.switch(leds, true);
            self.delay.delay(LED_HOLD);
            failed += self.switch(leds, false);
            self.delay.delay(LED_BLINK_GAP);
            failed += self.switch(leds, true);
            self.delay.delay(LED_HOLD);
            failed += self.switch(leds, false);
            if !last {
                self.delay.delay(LED_HOLD);
            }
        }

        failed
    }

    /// Drive both LEDs to `state`, red first
    pub fn set_leds(&mut self, state: LedState) -> usize {
        self.switch(&[Led::Red], state.red) + self.switch(&[Led::Green], state.green)
    }

    /// Run the heater for `seconds`
    ///
    /// The off command is sent on every path, including `seconds == 0` and
    /// after a failed on command.
    pub fn heater(&mut self, seconds: u8) -> usize {
        let mut failed = 0;

        if seconds > 0 {
            info!("Heating for {} seconds", seconds);
            if !self.silent {
                failed += self.switch(&[Led::Red], true);
            }
            failed += self.output(Payload::heater(true));

            self.delay.delay(Duration::from_secs(u64::from(seconds)));

            if !self.silent {
                failed += self.switch(&[Led::Red], false);
            }
        }

        failed + self.output(Payload::heater(false))
    }

    fn read_report(&mut self) -> std::result::Result<RawReport, UsbError> {
        control_transfer(
            self.handle,
            REQUEST_SET_REPORT,
            VALUE_MEASURE,
            &Payload::zeroed(),
            self.timeout,
        )?;

        self.delay.delay(CONVERSION_DELAY);

        let bytes = bulk_read(self.handle, REPORT_ENDPOINT, REPORT_LEN, self.timeout)?;
        RawReport::from_bytes(&bytes).map_err(|e| match e {
            ProtocolError::ReportTooShort { needed, actual } => UsbError::ShortTransfer {
                expected: needed,
                actual,
            },
            other => UsbError::Other {
                message: other.to_string(),
            },
        })
    }

    fn switch(&mut self, leds: &[Led], on: bool) -> usize {
        leds.iter()
            .map(|led| self.output(Payload::led(*led, on)))
            .sum()
    }

    /// Send one output command; a rejected command is logged and counted,
    /// never fatal
    fn output(&mut self, payload: Payload) -> usize {
        match write_output(self.handle, &payload, self.timeout) {
            Ok(_) => 0,
            Err(e) => {
                warn!("Output command {:02x?} failed: {}", &payload.as_bytes()[..2], e);
                1
            }
        }
    }

    /// Status LED around a measurement; failures only reach the debug trace
    fn indicator(&mut self, led: Led, on: bool) {
        if let Err(e) = write_output(self.handle, &Payload::led(led, on), self.timeout) {
            debug!("{:?} LED {} failed: {}", led, if on { "on" } else { "off" }, e);
        }
    }
}
