//! Layered configuration: CLI flags override an optional TOML file, which
//! overrides these built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub pattern: Option<String>,
    pub idfa: Option<String>,
    pub gaid: Option<String>,
    pub adid: Option<String>,
    pub dvid: Option<String>,
    pub batch_size: Option<usize>,
    pub max_retries: Option<u32>,
    pub base_backoff_ms: Option<u64>,
}

impl ConfigFile {
    /// Search order: `./appsload.toml`, then the OS config directory, then
    /// built-in defaults (an empty `ConfigFile`) if neither exists.
    pub fn load() -> Result<Self> {
        let local = PathBuf::from("appsload.toml");
        if local.exists() {
            return Self::from_file(&local);
        }

        if let Some(dirs) = directories::ProjectDirs::from("", "", "appsload") {
            let user_config = dirs.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("no config file found, using built-in defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_overrides() {
        let config = ConfigFile::default();
        assert!(config.pattern.is_none());
        assert!(config.batch_size.is_none());
    }

    #[test]
    fn parses_partial_toml() {
        let toml = r#"
pattern = "data/*.tsv.gz"
batch_size = 250
"#;
        let config: ConfigFile = toml::from_str(toml).unwrap();
        assert_eq!(config.pattern.as_deref(), Some("data/*.tsv.gz"));
        assert_eq!(config.batch_size, Some(250));
        assert!(config.idfa.is_none());
    }
}
