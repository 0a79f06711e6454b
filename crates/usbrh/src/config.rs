//! Configuration file management

use crate::format::OutputMode;
use crate::usb::DeviceFilter;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsbrhConfig {
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

/// Which device to talk to and how long to wait for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Vendor id, `0x` followed by 1-4 hex digits
    #[serde(default = "DeviceSettings::default_vendor_id")]
    pub vendor_id: String,
    /// Product id, `0x` followed by 1-4 hex digits
    #[serde(default = "DeviceSettings::default_product_id")]
    pub product_id: String,
    /// 1-based ordinal among matching devices
    #[serde(default = "DeviceSettings::default_index")]
    pub index: usize,
    /// Timeout for each control or bulk transfer
    #[serde(default = "DeviceSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            vendor_id: Self::default_vendor_id(),
            product_id: Self::default_product_id(),
            index: Self::default_index(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

impl DeviceSettings {
    fn default_vendor_id() -> String {
        format!("{:#06x}", protocol::VENDOR_ID)
    }

    fn default_product_id() -> String {
        format!("{:#06x}", protocol::PRODUCT_ID)
    }

    fn default_index() -> usize {
        1
    }

    fn default_timeout_ms() -> u64 {
        5000
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "OutputSettings::default_log_level")]
    pub log_level: String,
    /// Keep the status LEDs dark
    #[serde(default)]
    pub silent: bool,
    /// Output used when no mode flag is given
    #[serde(default)]
    pub mode: OutputMode,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            silent: false,
            mode: OutputMode::default(),
        }
    }
}

impl OutputSettings {
    fn default_log_level() -> String {
        "warn".to_string()
    }
}

impl UsbrhConfig {
    /// Load and validate configuration from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: UsbrhConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        tracing::debug!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Load from an explicit path, else the first standard location that
    /// exists, else built-in defaults
    pub fn resolve(path: Option<&str>) -> Result<Self> {
        match path.map(expand_path).or_else(Self::locate) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// First existing standard configuration file
    pub fn locate() -> Option<PathBuf> {
        [Self::default_path(), PathBuf::from("/etc/usbrh/config.toml")]
            .into_iter()
            .find(|p| p.exists())
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usbrh").join("config.toml")
        } else {
            PathBuf::from(".config/usbrh/config.toml")
        }
    }

    /// Vendor/product filter described by the `[device]` section
    pub fn filter(&self) -> Result<DeviceFilter> {
        Ok(DeviceFilter::new(
            parse_hex_id(&self.device.vendor_id, "vendor_id")?,
            parse_hex_id(&self.device.product_id, "product_id")?,
        ))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.device.timeout_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.output.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.output.log_level,
                VALID_LOG_LEVELS.join(", ")
            ));
        }

        self.filter()?;

        if self.device.index == 0 {
            return Err(anyhow!("Invalid device index 0, devices are numbered from 1"));
        }

        if self.device.timeout_ms == 0 {
            return Err(anyhow!("Invalid timeout_ms 0, must be positive"));
        }

        Ok(())
    }
}

/// Parse a `0x`-prefixed vendor or product id
fn parse_hex_id(id: &str, name: &str) -> Result<u16> {
    let hex_part = id
        .strip_prefix("0x")
        .or_else(|| id.strip_prefix("0X"))
        .ok_or_else(|| {
            anyhow!(
                "Invalid {} '{}', must start with '0x' (e.g., '0x1774')",
                name,
                id
            )
        })?;

    if hex_part.is_empty() || hex_part.len() > 4 {
        return Err(anyhow!(
            "Invalid {} '{}', hex part must be 1-4 digits",
            name,
            id
        ));
    }

    u16::from_str_radix(hex_part, 16)
        .map_err(|_| anyhow!("Invalid {} '{}', not a valid hex number", name, id))
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = UsbrhConfig::default();
        assert_eq!(config.device.vendor_id, "0x1774");
        assert_eq!(config.device.product_id, "0x1001");
        assert_eq!(config.device.index, 1);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.output.log_level, "warn");
        assert_eq!(config.output.mode, OutputMode::Plain);
        assert!(!config.output.silent);
        assert!(config.validate().is_ok());
        assert_eq!(config.filter().unwrap(), DeviceFilter::default());
    }

    #[test]
    fn test_parse_hex_id() {
        assert_eq!(parse_hex_id("0x1774", "vendor_id").unwrap(), 0x1774);
        assert_eq!(parse_hex_id("0X1", "vendor_id").unwrap(), 1);
        assert!(parse_hex_id("1774", "vendor_id").is_err());
        assert!(parse_hex_id("0x", "vendor_id").is_err());
        assert!(parse_hex_id("0x12345", "vendor_id").is_err());
        assert!(parse_hex_id("0xZZZZ", "vendor_id").is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let file = write_config(
            r#"
[device]
index = 2

[output]
mode = "mrtg"
"#,
        );

        let config = UsbrhConfig::load(file.path()).unwrap();
        assert_eq!(config.device.index, 2);
        assert_eq!(config.device.vendor_id, "0x1774");
        assert_eq!(config.output.mode, OutputMode::Mrtg);
        assert_eq!(config.output.log_level, "warn");
    }

    #[test]
    fn test_invalid_values_rejected() {
        for content in [
            "[output]\nlog_level = \"loud\"\n",
            "[device]\nvendor_id = \"1774\"\n",
            "[device]\nindex = 0\n",
            "[device]\ntimeout_ms = 0\n",
            "[output]\nmode = \"csv\"\n",
        ] {
            let file = write_config(content);
            assert!(
                UsbrhConfig::load(file.path()).is_err(),
                "accepted: {}",
                content
            );
        }
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = UsbrhConfig::default();
        config.device.product_id = "0x1002".to_string();
        config.output.silent = true;
        config.save(&path).unwrap();

        let loaded = UsbrhConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.filter().unwrap().product_id, 0x1002);
    }

    #[test]
    fn test_resolve_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(UsbrhConfig::resolve(missing.to_str()).is_err());
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("/etc/usbrh.toml"), PathBuf::from("/etc/usbrh.toml"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/usbrh.toml"), home.join("usbrh.toml"));
        }
    }
}
