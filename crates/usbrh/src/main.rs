//! usbrh
//!
//! Command line tool for USBRH temperature/humidity sensor modules.

use clap::Parser;
use common::{Error, Result, ThreadDelay, setup_logging};
use std::io::Write;
use std::process::ExitCode;
use tracing::{debug, info};
use usbrh::cli::Args;
use usbrh::commands::{self, CommandOutcome, RunSettings};
use usbrh::config::{UsbrhConfig, expand_path};
use usbrh::format::{render_listing, render_measurement};
use usbrh::usb::RusbBus;

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version come through here as well
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(args: Args) -> Result<()> {
    if args.save_config {
        let path = args
            .config
            .as_deref()
            .map(expand_path)
            .unwrap_or_else(UsbrhConfig::default_path);
        UsbrhConfig::default()
            .save(&path)
            .map_err(|e| Error::Config(format!("{:#}", e)))?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = UsbrhConfig::resolve(args.config.as_deref())
        .map_err(|e| Error::Config(format!("{:#}", e)))?;

    let request = args.request(&config)?;

    setup_logging(args.log_level(&config), request.debug)?;
    info!("usbrh v{}", env!("CARGO_PKG_VERSION"));

    let settings = RunSettings {
        filter: config
            .filter()
            .map_err(|e| Error::Config(format!("{:#}", e)))?,
        timeout: config.timeout(),
    };
    debug!("{:?} with {:?}", request, settings);

    let bus = RusbBus::new().map_err(Error::Usb)?;
    let mut stdout = std::io::stdout().lock();

    commands::run(&bus, &request, &settings, &mut ThreadDelay, |outcome| {
        match outcome {
            CommandOutcome::Measurement(m) => {
                stdout.write_all(render_measurement(request.output_mode(), m)?.as_bytes())?
            }
            CommandOutcome::Devices(devices) => {
                stdout.write_all(render_listing(devices).as_bytes())?
            }
            CommandOutcome::Completed { .. } => {}
        }
        stdout.flush()?;
        Ok(())
    })
}
