//! Client configuration structures and loaders.
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use vitals_core::VitalsConfig;
use vitals_runtime::RuntimeConfig;

/// Where the client finds its inputs and writes its logs.
#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    /// TOML file holding a [`VitalsConfig`].
    pub config_file: Option<PathBuf>,
    /// Scenario to play; the built-in one when unset.
    pub scenario_file: Option<PathBuf>,
    /// Directory for the log file. No file logging when unset.
    pub log_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `VITALS_CONFIG` - Attribute config TOML (default: built-in values)
    /// - `VITALS_SCENARIO` - Scenario TOML (default: built-in scenario)
    /// - `VITALS_LOG_DIR` - Log directory; `default` picks the platform cache dir
    pub fn from_env() -> Self {
        Self {
            config_file: env::var_os("VITALS_CONFIG").map(PathBuf::from),
            scenario_file: env::var_os("VITALS_SCENARIO").map(PathBuf::from),
            log_dir: env::var("VITALS_LOG_DIR").ok().map(|dir| {
                if dir == "default" {
                    default_log_dir()
                } else {
                    PathBuf::from(dir)
                }
            }),
        }
    }

    /// Runtime configuration: the attribute config file (if any), then
    /// environment overrides.
    pub fn runtime_config(&self) -> Result<RuntimeConfig> {
        let vitals = match &self.config_file {
            Some(path) => load_vitals_config(path)?,
            None => VitalsConfig::default(),
        };

        Ok(RuntimeConfig {
            vitals,
            ..RuntimeConfig::default()
        }
        .with_env_overrides())
    }
}

/// Load a [`VitalsConfig`] from a TOML file. Missing keys keep their
/// defaults.
pub fn load_vitals_config(path: &Path) -> Result<VitalsConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config TOML {}", path.display()))
}

/// Platform cache directory for logs, e.g. `~/.cache/vitals/logs` on Linux.
pub fn default_log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "vitals")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/vitals"))
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use vitals_core::{RescalePolicy, StatFamily};

    #[test]
    fn loads_partial_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
rescale_policy = "hard_clamp"

[defaults.health]
max = 250.0
current = 40.0
regen = 3.5
"#
        )
        .unwrap();

        let config = load_vitals_config(file.path()).unwrap();

        assert_eq!(config.rescale_policy, RescalePolicy::HardClamp);
        assert_eq!(config.regen_interval_ms, VitalsConfig::DEFAULT_REGEN_INTERVAL_MS);
        let health = config.defaults.family(StatFamily::Health).unwrap();
        assert_eq!(health.sanitized(), (40.0, 250.0, 3.5));
    }

    #[test]
    fn reports_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_vitals_config(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn rejects_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rescale_policy = \"sideways\"").unwrap();
        assert!(load_vitals_config(file.path()).is_err());
    }
}
