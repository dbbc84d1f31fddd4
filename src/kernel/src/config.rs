//! Kernel options.
//!
//! Options come from a whitespace-separated `key=value` command line that is
//! baked in at build time through the `PROBEOS_CMDLINE` environment variable.
//! Unknown keys are ignored so older command lines keep working.

use alloc::string::{String, ToString};
use core::fmt;
use log::LevelFilter;

/// Command line used when none is supplied at build time.
pub const DEFAULT_CMDLINE: &str = "";

/// Name of the screen device in the device name service.
pub const SCREEN_DEVICE: &str = "tty1";

/// Error produced while parsing the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A token had no `=`.
    MissingValue(String),
    /// A value could not be parsed for its key.
    InvalidValue {
        /// The offending key.
        key: String,
        /// The raw value.
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingValue(token) => write!(f, "option '{}' has no value", token),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "invalid value '{}' for option '{}'", value, key)
            }
        }
    }
}

/// Kernel options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Device the logger writes to, if registered.
    pub log_device: String,
    /// Maximum log level.
    pub log_level: LevelFilter,
    /// Requested screen width in columns (0 = default).
    pub width: usize,
    /// Requested screen height in rows (0 = default).
    pub height: usize,
    /// Serial port baud rate.
    pub baud: u32,
    /// Partition the filesystem is mounted from.
    pub partition: String,
    /// File written by the runtime probe.
    pub output_file: String,
    /// Tracked instances per block in the exhaustion probe.
    pub block_len: usize,
    /// Size of the RAM-backed storage device in KiB.
    pub ramdisk_kib: usize,
    /// Optional byte budget for the exhaustion probe.
    pub quota: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            log_device: String::from(SCREEN_DEVICE),
            log_level: LevelFilter::Info,
            width: 0,
            height: 0,
            baud: 115_200,
            partition: String::from("emmc1-1"),
            output_file: String::from("test.txt"),
            block_len: 10_000_000,
            ramdisk_kib: 1024,
            quota: None,
        }
    }
}

impl Options {
    /// Options from the build-time command line.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::parse(option_env!("PROBEOS_CMDLINE").unwrap_or(DEFAULT_CMDLINE))
    }

    /// Parse a `key=value` command line on top of the defaults.
    pub fn parse(cmdline: &str) -> Result<Self, ConfigError> {
        let mut options = Self::default();
        for token in cmdline.split_whitespace() {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| ConfigError::MissingValue(token.to_string()))?;
            options.set(key, value)?;
        }
        Ok(options)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "logdev" => {
                if value.is_empty() {
                    return Err(invalid());
                }
                self.log_device = value.to_string();
            }
            "loglevel" => self.log_level = parse_level(value).ok_or_else(invalid)?,
            "width" => self.width = value.parse().map_err(|_| invalid())?,
            "height" => self.height = value.parse().map_err(|_| invalid())?,
            "baud" => {
                let baud: u32 = value.parse().map_err(|_| invalid())?;
                if baud == 0 {
                    return Err(invalid());
                }
                self.baud = baud;
            }
            "partition" => {
                if value.is_empty() {
                    return Err(invalid());
                }
                self.partition = value.to_string();
            }
            "file" => {
                if value.is_empty() || value.contains('/') {
                    return Err(invalid());
                }
                self.output_file = value.to_string();
            }
            "blocklen" => {
                let len: usize = value.parse().map_err(|_| invalid())?;
                if len == 0 {
                    return Err(invalid());
                }
                self.block_len = len;
            }
            "ramdisk" => {
                let kib: usize = value.parse().map_err(|_| invalid())?;
                if kib == 0 {
                    return Err(invalid());
                }
                self.ramdisk_kib = kib;
            }
            "quota" => self.quota = Some(value.parse().map_err(|_| invalid())?),
            _ => {}
        }
        Ok(())
    }
}

/// Numeric levels 0 (panic) to 4 (debug).
fn parse_level(value: &str) -> Option<LevelFilter> {
    match value {
        "0" | "1" => Some(LevelFilter::Error),
        "2" => Some(LevelFilter::Warn),
        "3" => Some(LevelFilter::Info),
        "4" => Some(LevelFilter::Debug),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cmdline_gives_defaults() {
        let options = Options::parse("").unwrap();
        assert_eq!(options, Options::default());
        assert_eq!(options.partition, "emmc1-1");
        assert_eq!(options.log_device, SCREEN_DEVICE);
        assert_eq!(options.block_len, 10_000_000);
    }

    #[test]
    fn test_parse_overrides() {
        let options =
            Options::parse("logdev=ttyS1 loglevel=4 baud=9600 blocklen=1000 quota=65536").unwrap();
        assert_eq!(options.log_device, "ttyS1");
        assert_eq!(options.log_level, LevelFilter::Debug);
        assert_eq!(options.baud, 9600);
        assert_eq!(options.block_len, 1000);
        assert_eq!(options.quota, Some(65536));
        assert_eq!(options.output_file, "test.txt");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let options = Options::parse("fast=true  width=80").unwrap();
        assert_eq!(options.width, 80);
    }

    #[test]
    fn test_malformed_options() {
        assert_eq!(
            Options::parse("logdev"),
            Err(ConfigError::MissingValue("logdev".to_string()))
        );
        assert!(matches!(
            Options::parse("loglevel=9"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(Options::parse("blocklen=0").is_err());
        assert!(Options::parse("file=a/b.txt").is_err());
        assert!(Options::parse("baud=fast").is_err());
    }
}
