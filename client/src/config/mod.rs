//! Configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Directory served as the share by `LocalFileSource`
    #[serde(default = "default_share_root")]
    pub share_root: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferConfig {
    /// Largest single queued read, in bytes
    #[serde(default = "default_max_read_size")]
    pub max_read_size: usize,
    /// Channels allowed to read at once
    #[serde(default = "default_max_parallel_reads")]
    pub max_parallel_reads: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            share_root: default_share_root(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_read_size: default_max_read_size(),
            max_parallel_reads: default_max_parallel_reads(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_share_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_read_size() -> usize {
    65536
}

fn default_max_parallel_reads() -> u32 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        Self::parse(&contents)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.transfer.max_read_size == 0 {
            anyhow::bail!("transfer.max_read_size must be greater than 0");
        }
        if self.transfer.max_parallel_reads == 0 {
            anyhow::bail!("transfer.max_parallel_reads must be greater than 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [general]
            share_root = "/srv/share"

            [transfer]
            max_read_size = 4096
            max_parallel_reads = 2

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.general.share_root, PathBuf::from("/srv/share"));
        assert_eq!(config.transfer.max_read_size, 4096);
        assert_eq!(config.transfer.max_parallel_reads, 2);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = Config::parse("[transfer]\nmax_parallel_reads = 8\n").unwrap();
        assert_eq!(config.transfer.max_read_size, 65536);
        assert_eq!(config.transfer.max_parallel_reads, 8);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.general.share_root, PathBuf::from("."));
    }

    #[test]
    fn test_rejects_zero_limits() {
        assert!(Config::parse("[transfer]\nmax_read_size = 0\n").is_err());
        assert!(Config::parse("[transfer]\nmax_parallel_reads = 0\n").is_err());
        assert!(Config::parse("[transfer]\nmax_read_size = \"big\"\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("smbcore-no-such-config.conf");
        assert!(Config::load(&path).is_err());
        assert_eq!(
            Config::load_or_default(&path).unwrap().transfer.max_read_size,
            65536
        );
    }
}
