//! Command line surface
//!
//! Short flags follow the classic usbrh tool, so `-h` selects humidity and
//! help is only available as `--help`.

use crate::commands::{Command, CommandRequest, MAX_HEATER_SECONDS};
use crate::config::UsbrhConfig;
use crate::format::OutputMode;
use clap::{ArgAction, ArgGroup, Parser};
use common::{Error, Result};
use protocol::LedState;

#[derive(Parser, Debug)]
#[command(name = "usbrh")]
#[command(
    author,
    version,
    about = "Read temperature and humidity from USBRH sensor modules"
)]
#[command(disable_help_flag = true)]
#[command(group(
    ArgGroup::new("mode")
        .multiple(false)
        .args(["temperature", "humidity", "mrtg", "json", "list", "led", "heater", "led_test"])
))]
#[command(long_about = "
Reads the SHT1x-based USBRH temperature/humidity module over libusb and prints
the calibrated values, or drives its LEDs and heater.

EXAMPLES:
    # Temperature and humidity of the first sensor
    usbrh

    # MRTG target on the second sensor, without blinking the LEDs
    usbrh -m -s -f 2

    # Heat the sensor for 10 seconds
    usbrh -H 10

CONFIGURATION:
    Defaults are read from the first file found of:
    1. Path specified with --config
    2. ~/.config/usbrh/config.toml
    3. /etc/usbrh/config.toml
")]
pub struct Args {
    /// Print Celsius, Fahrenheit and humidity on separate lines
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// MRTG output of the temperature
    #[arg(short = 't', long)]
    pub temperature: bool,

    /// MRTG output of the humidity
    #[arg(short = 'h', long)]
    pub humidity: bool,

    /// MRTG output of temperature and humidity
    #[arg(short = 'm', long)]
    pub mrtg: bool,

    /// Labelled values on one line
    #[arg(short = '1', long = "one-line")]
    pub one_line: bool,

    /// Print the reading as JSON
    #[arg(long)]
    pub json: bool,

    /// Dump every USB transfer to stderr
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Do not light the status LEDs
    #[arg(short = 's', long, conflicts_with_all = ["led", "led_test"])]
    pub silent: bool,

    /// List connected sensors and exit
    #[arg(short = 'l', long = "list")]
    pub list: bool,

    /// Use the N-th sensor found (1-based)
    #[arg(short = 'f', long = "device", value_name = "N")]
    pub device: Option<usize>,

    /// Set the LEDs: bit 0 red, bit 1 green
    #[arg(short = 'L', long = "led", value_name = "0-3",
          value_parser = clap::value_parser!(u8).range(0..=3))]
    pub led: Option<u8>,

    /// Run the heater for SECONDS (0 switches it off)
    #[arg(short = 'H', long = "heater", value_name = "SECONDS",
          value_parser = clap::value_parser!(u8).range(0..=MAX_HEATER_SECONDS as i64))]
    pub heater: Option<u8>,

    /// Blink the LEDs through a self-test pattern
    #[arg(long = "led-test")]
    pub led_test: bool,

    /// Path to configuration file
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<String>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    pub save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

impl Args {
    /// Build the request, filling anything not given on the command line
    /// from `config`
    pub fn request(&self, config: &UsbrhConfig) -> Result<CommandRequest> {
        if (self.verbose || self.one_line)
            && (self.temperature || self.humidity || self.mrtg || self.json)
        {
            return Err(Error::Argument(
                "-v and -1 cannot be combined with -t, -h, -m or --json".to_string(),
            ));
        }

        let command = if self.list {
            Command::ListDevices
        } else if self.led_test {
            Command::LedTest
        } else if let Some(bits) = self.led {
            let state = LedState::from_bits(bits).map_err(|e| Error::Argument(e.to_string()))?;
            Command::LedSet(state)
        } else if let Some(seconds) = self.heater {
            Command::Heater { seconds }
        } else {
            Command::Measure(self.output_mode(config.output.mode))
        };

        if !matches!(command, Command::Measure(_)) && (self.verbose || self.one_line) {
            return Err(Error::Argument(
                "-v and -1 only apply to measurements".to_string(),
            ));
        }

        Ok(CommandRequest {
            command,
            device_index: self.device.unwrap_or(config.device.index),
            silent: self.silent || config.output.silent,
            debug: self.debug,
        })
    }

    fn output_mode(&self, default: OutputMode) -> OutputMode {
        if self.verbose {
            OutputMode::Verbose
        } else if self.temperature {
            OutputMode::Temperature
        } else if self.humidity {
            OutputMode::Humidity
        } else if self.mrtg {
            OutputMode::Mrtg
        } else if self.one_line {
            OutputMode::OneLine
        } else if self.json {
            OutputMode::Json
        } else {
            default
        }
    }

    /// Fallback log level: `--log-level`, then the config file
    ///
    /// `-d` is not folded in here; it travels as [`CommandRequest::debug`]
    /// and forces the debug trace on regardless of `RUST_LOG`.
    pub fn log_level<'a>(&'a self, config: &'a UsbrhConfig) -> &'a str {
        self.log_level.as_deref().unwrap_or(&config.output.log_level)
    }
}
