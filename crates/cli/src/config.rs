//! Console configuration file.
//!
//! Resolution order: an explicit path (`--config` or `SMCONSOLE_CONFIG`),
//! then `<config dir>/smconsole/config.yaml` when it exists, then defaults.
//! Command-line flags are applied on top by [`ConsoleConfig::apply_overrides`].

use serde::{Deserialize, Serialize};
use smconsole_diagnostics::{CheckMode, CheckPolicy};
use smconsole_simplemotion_v2::NodeAddress;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::CliError;

/// Name of the in-process simulated bus.
pub const VIRTUAL_BUS: &str = "virtual";

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub bus: BusConfig,
    pub check: CheckConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Bus device name, e.g. a serial port, or `virtual`.
    pub name: String,
    pub device_address: NodeAddress,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            name: VIRTUAL_BUS.to_string(),
            device_address: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Mode of the check that follows every console action.
    pub mode: CheckMode,
    pub max_consecutive_fast_checks: Option<u32>,
}

impl CheckConfig {
    pub fn policy(&self) -> CheckPolicy {
        CheckPolicy {
            max_consecutive_fast_checks: self.max_consecutive_fast_checks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ConsoleConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CliError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let yaml = fs::read_to_string(path).map_err(|e| {
            CliError::InvalidConfiguration(format!("cannot read {}: {}", path.display(), e))
        })?;
        debug!("Loaded config from {}", path.display());
        Self::from_yaml_str(&yaml)
    }

    /// Per-user config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("smconsole").join("config.yaml"))
    }

    /// Load the explicit file if given, else the per-user file if present,
    /// else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, CliError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Apply command-line overrides.
    pub fn apply_overrides(
        &mut self,
        bus: Option<&str>,
        address: Option<NodeAddress>,
        fast: bool,
    ) -> Result<(), CliError> {
        if let Some(name) = bus {
            self.bus.name = name.to_string();
        }
        if let Some(address) = address {
            self.bus.device_address = address;
        }
        if fast {
            self.check.mode = CheckMode::Fast;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), CliError> {
        if self.bus.name.trim().is_empty() {
            return Err(CliError::InvalidConfiguration(
                "bus.name must not be empty".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&self.log.level.as_str()) {
            return Err(CliError::InvalidConfiguration(format!(
                "log.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        if self.bus.device_address == 0 {
            return Err(CliError::InvalidConfiguration(
                "bus.device_address must be between 1 and 255".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.bus.name, VIRTUAL_BUS);
        assert_eq!(config.bus.device_address, 1);
        assert_eq!(config.check.mode, CheckMode::Thorough);
        assert_eq!(config.check.policy(), CheckPolicy::default());
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_partial_document_keeps_defaults() -> TestResult {
        let config = ConsoleConfig::from_yaml_str("check:\n  mode: fast\n")?;
        assert_eq!(config.check.mode, CheckMode::Fast);
        assert_eq!(config.bus, BusConfig::default());
        Ok(())
    }

    #[test]
    fn test_full_document() -> TestResult {
        let yaml = "\
bus:
  name: /dev/ttyUSB0
  device_address: 4
check:
  mode: fast
  max_consecutive_fast_checks: 8
log:
  level: debug
";
        let config = ConsoleConfig::from_yaml_str(yaml)?;
        assert_eq!(config.bus.name, "/dev/ttyUSB0");
        assert_eq!(config.bus.device_address, 4);
        assert_eq!(config.check.policy(), CheckPolicy::escalate_after(8));
        assert_eq!(config.log.level, "debug");
        Ok(())
    }

    #[test]
    fn test_yaml_round_trip() -> TestResult {
        let mut config = ConsoleConfig::default();
        config.check.max_consecutive_fast_checks = Some(2);
        let yaml = serde_yaml::to_string(&config)?;
        assert_eq!(ConsoleConfig::from_yaml_str(&yaml)?, config);
        Ok(())
    }

    #[test]
    fn test_zero_address_is_rejected() {
        let result = ConsoleConfig::from_yaml_str("bus:\n  device_address: 0\n");
        assert!(matches!(result, Err(CliError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let result = ConsoleConfig::from_yaml_str("log:\n  level: loud\n");
        assert!(matches!(result, Err(CliError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_unknown_mode_is_a_yaml_error() {
        let result = ConsoleConfig::from_yaml_str("check:\n  mode: sometimes\n");
        assert!(matches!(result, Err(CliError::YamlError(_))));
    }

    #[test]
    fn test_load_from_file() -> TestResult {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "bus:\n  device_address: 7")?;
        let config = ConsoleConfig::resolve(Some(file.path()))?;
        assert_eq!(config.bus.device_address, 7);
        Ok(())
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() -> TestResult {
        let dir = tempfile::tempdir()?;
        let result = ConsoleConfig::resolve(Some(&dir.path().join("missing.yaml")));
        assert!(matches!(result, Err(CliError::InvalidConfiguration(_))));
        Ok(())
    }

    #[test]
    fn test_overrides_win_over_file_values() -> TestResult {
        let mut config = ConsoleConfig::from_yaml_str("bus:\n  name: /dev/ttyS0\n")?;
        config.apply_overrides(Some(VIRTUAL_BUS), Some(3), true)?;
        assert_eq!(config.bus.name, VIRTUAL_BUS);
        assert_eq!(config.bus.device_address, 3);
        assert_eq!(config.check.mode, CheckMode::Fast);
        Ok(())
    }

    #[test]
    fn test_no_overrides_keep_file_values() -> TestResult {
        let mut config = ConsoleConfig::from_yaml_str("check:\n  mode: fast\n")?;
        config.apply_overrides(None, None, false)?;
        assert_eq!(config.check.mode, CheckMode::Fast);
        Ok(())
    }
}
