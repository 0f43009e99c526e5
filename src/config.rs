use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::extract::DEFAULT_MAX_EXTRACTED_BYTES;

/// Verification settings (`sumverify.yaml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Number of records verified concurrently
    pub jobs: usize,
    /// TCP connect timeout for archive downloads
    pub connect_timeout_secs: u64,
    /// Total timeout for a single archive download
    pub timeout_secs: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Upper bound on a downloaded archive's size
    pub max_archive_bytes: u64,
    /// Upper bound on the total decompressed size of one archive
    pub max_extracted_bytes: u64,
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(8)
}

impl Default for VerifyConfig {
    fn default() -> Self {
        VerifyConfig {
            jobs: default_jobs(),
            connect_timeout_secs: 10,
            timeout_secs: 120,
            user_agent: format!("sumverify/{}", env!("CARGO_PKG_VERSION")),
            max_archive_bytes: 512 * 1024 * 1024,
            max_extracted_bytes: DEFAULT_MAX_EXTRACTED_BYTES,
        }
    }
}

impl VerifyConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: VerifyConfig = serde_yaml::from_str(yaml)
            .with_context(|| "Failed to parse config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            anyhow::bail!("jobs must be at least 1");
        }
        if self.connect_timeout_secs == 0 || self.timeout_secs == 0 {
            anyhow::bail!("timeouts must be greater than zero");
        }
        if self.max_archive_bytes == 0 || self.max_extracted_bytes == 0 {
            anyhow::bail!("archive size limits must be greater than zero");
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
