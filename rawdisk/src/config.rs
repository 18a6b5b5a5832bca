// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

pub const DEFAULT_CONFIG_FILE: &str = "rawdisk.toml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DiskConfig {
    pub sector_size: u64,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            sector_size: rawpart::DEFAULT_SECTOR_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TransferConfig {
    pub chunk_size: usize,
    pub verify: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: rawio::transfer::DEFAULT_CHUNK_SIZE,
            verify: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub disk: DiskConfig,
    pub transfer: TransferConfig,
}

impl Config {
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// An explicit path must exist; the default file is optional.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    crate::log_verbose!("Using config {}", default.display());
                    Self::from_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let ss = self.disk.sector_size;
        if ss < rawpart::MIN_SECTOR_SIZE || !ss.is_power_of_two() {
            anyhow::bail!("sector_size must be a power of two >= 512 (got {ss})");
        }
        if self.transfer.chunk_size < rawio::transfer::MIN_CHUNK_SIZE {
            anyhow::bail!(
                "chunk_size must be at least {} bytes (got {})",
                rawio::transfer::MIN_CHUNK_SIZE,
                self.transfer.chunk_size
            );
        }
        Ok(())
    }

    /// Applies command-line overrides on top of file values.
    pub fn with_overrides(
        mut self,
        sector_size: Option<u64>,
        chunk_size: Option<usize>,
        verify: bool,
    ) -> anyhow::Result<Self> {
        if let Some(ss) = sector_size {
            self.disk.sector_size = ss;
        }
        if let Some(cs) = chunk_size {
            self.transfer.chunk_size = cs;
        }
        self.transfer.verify |= verify;
        self.validate()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_empty() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.disk.sector_size, 512);
        assert_eq!(config.transfer.chunk_size, 1024 * 1024);
        assert!(!config.transfer.verify);
    }

    #[test]
    fn partial_file_and_overrides() {
        let config = Config::parse("[transfer]\nverify = true\nchunk_size = 65536\n").unwrap();
        assert_eq!(config.disk.sector_size, 512);
        assert_eq!(config.transfer.chunk_size, 65536);
        assert!(config.transfer.verify);

        let config = config.with_overrides(Some(4096), None, false).unwrap();
        assert_eq!(config.disk.sector_size, 4096);
        assert_eq!(config.transfer.chunk_size, 65536);
        assert!(config.transfer.verify);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::parse("[disk]\nsector_size = 520\n").is_err());
        assert!(Config::parse("[transfer]\nchunk_size = 100\n").is_err());
        assert!(Config::parse("[disk]\nblock = 1\n").is_err());
        assert!(Config::default().with_overrides(Some(256), None, false).is_err());
    }

    #[test]
    fn reads_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[disk]\nsector_size = 4096").unwrap();
        let config = Config::load(Some(f.path())).unwrap();
        assert_eq!(config.disk.sector_size, 4096);
        assert!(Config::load(Some(Path::new("/nonexistent/rawdisk.toml"))).is_err());
    }
}
