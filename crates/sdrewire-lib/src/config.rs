//! Application configuration — TOML-based, platform-aware paths.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SdrewireError};
use crate::protocol::DEFAULT_TIMEOUT_MS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default device serial. Empty = match any device.
    #[serde(default)]
    pub serial: String,

    /// Control-transfer timeout in milliseconds. Default: 1000.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            serial: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sdrewire"))
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Load config from `custom` (or the default path), logging parse warnings.
    pub fn load(custom: Option<&Path>) -> Self {
        let path = custom.map(Path::to_path_buf).or_else(Self::path);
        let Some(path) = path else {
            return Self::default();
        };
        let (config, warnings) = Self::load_from(&path);
        for w in &warnings {
            log::warn!("{w}");
        }
        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(SdrewireError::Config("timeout_ms must be > 0".into()));
        }
        Ok(())
    }
}

/// Values resolved once at startup from the config file and command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Serial filter; `None` matches every device.
    pub serial: Option<String>,
    pub timeout: Duration,
}

impl Settings {
    /// Merge `config` with command-line overrides. CLI values win.
    pub fn resolve(config: &Config, cli_serial: Option<&str>) -> Result<Self> {
        config.validate()?;
        let serial = cli_serial
            .or(Some(config.serial.as_str()))
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(Settings {
            serial,
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let c = Config::default();
        assert!(c.serial.is_empty());
        assert_eq!(c.timeout_ms, 1000);
    }

    #[test]
    fn load_from_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (c, warnings) = Config::load_from(&dir.path().join("nope.toml"));
        assert_eq!(c, Config::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn load_from_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "serial = \"ABC123\"\ntimeout_ms = 250\n").unwrap();
        let (c, warnings) = Config::load_from(&path);
        assert!(warnings.is_empty());
        assert_eq!(c.serial, "ABC123");
        assert_eq!(c.timeout_ms, 250);
    }

    #[test]
    fn load_from_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "serial = \"X\"\n").unwrap();
        let (c, _) = Config::load_from(&path);
        assert_eq!(c.timeout_ms, 1000);
    }

    #[test]
    fn load_from_garbage_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timeout_ms = \"soon\"").unwrap();
        let (c, warnings) = Config::load_from(&path);
        assert_eq!(c, Config::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("config parse error"));
    }

    #[test]
    fn load_with_custom_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "timeout_ms = 42\n").unwrap();
        assert_eq!(Config::load(Some(&path)).timeout_ms, 42);
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let c = Config {
            timeout_ms: 0,
            ..Config::default()
        };
        assert!(matches!(c.validate(), Err(SdrewireError::Config(_))));
    }

    #[test]
    fn settings_cli_serial_overrides_config() {
        let c = Config {
            serial: "FROMFILE".into(),
            ..Config::default()
        };
        let s = Settings::resolve(&c, Some("FROMCLI")).unwrap();
        assert_eq!(s.serial.as_deref(), Some("FROMCLI"));
    }

    #[test]
    fn settings_fall_back_to_config_serial() {
        let c = Config {
            serial: "FROMFILE".into(),
            timeout_ms: 300,
        };
        let s = Settings::resolve(&c, None).unwrap();
        assert_eq!(s.serial.as_deref(), Some("FROMFILE"));
        assert_eq!(s.timeout, Duration::from_millis(300));
    }

    #[test]
    fn settings_empty_serial_is_none() {
        let s = Settings::resolve(&Config::default(), Some("")).unwrap();
        assert_eq!(s.serial, None);
        let s = Settings::resolve(&Config::default(), None).unwrap();
        assert_eq!(s.serial, None);
    }

    #[test]
    fn settings_keep_serial_verbatim() {
        let s = Settings::resolve(&Config::default(), Some(" ABC ")).unwrap();
        assert_eq!(s.serial.as_deref(), Some(" ABC "));
    }

    #[test]
    fn settings_reject_invalid_config() {
        let c = Config {
            timeout_ms: 0,
            ..Config::default()
        };
        assert!(Settings::resolve(&c, None).is_err());
    }

    #[test]
    fn config_path_ends_with_toml() {
        if let Some(p) = Config::path() {
            assert!(p.ends_with("sdrewire/config.toml"));
        }
    }
}
