//! Output rendering
//!
//! Everything written to stdout goes through here. The MRTG modes emit the
//! four-line block MRTG expects from an external script: two values, an uptime
//! line (left blank) and a target name.

use crate::usb::DeviceListing;
use common::Result;
use protocol::Measurement;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// How a measurement is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// `<temp> <humidity>`
    #[default]
    Plain,
    /// One labelled line per quantity
    Verbose,
    /// Labelled values on a single line
    OneLine,
    /// MRTG block with the temperature twice
    Temperature,
    /// MRTG block with the humidity twice
    Humidity,
    /// MRTG block with temperature and humidity
    Mrtg,
    Json,
}

/// Render a measurement, newline-terminated
pub fn render_measurement(mode: OutputMode, m: &Measurement) -> Result<String> {
    let out = match mode {
        OutputMode::Plain => format!("{:.2} {:.2}\n", m.temp_c, m.humidity_pct),
        OutputMode::Verbose => format!(
            "Temperature: {:.2} C\nTemperature: {:.2} F\nHumidity: {:.2} %\n",
            m.temp_c, m.temp_f, m.humidity_pct
        ),
        OutputMode::OneLine => format!(
            "Temperature: {:.2} C Humidity: {:.2} %\n",
            m.temp_c, m.humidity_pct
        ),
        OutputMode::Temperature => mrtg_block(m.temp_c, m.temp_c, "Temperature"),
        OutputMode::Humidity => mrtg_block(m.humidity_pct, m.humidity_pct, "Humidity"),
        OutputMode::Mrtg => mrtg_block(m.temp_c, m.humidity_pct, "Temperature/Humidity"),
        OutputMode::Json => {
            let mut json = serde_json::to_string(m).map_err(std::io::Error::from)?;
            json.push('\n');
            json
        }
    };
    Ok(out)
}

fn mrtg_block(first: f64, second: f64, target: &str) -> String {
    format!("{:.2}\n{:.2}\n\n{}\n", first, second, target)
}

/// Render the device listing
pub fn render_listing(devices: &[DeviceListing]) -> String {
    let mut out = String::from("listing:USBRH\n");
    for device in devices {
        // writing to a String cannot fail
        let _ = writeln!(
            out,
            "{}: bus={:03} device={:03}",
            device.ordinal, device.bus_number, device.address
        );
    }
    let _ = writeln!(out, "{} device(s) found.", devices.len());
    out
}
