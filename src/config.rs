//! Run configuration, loaded from an optional TOML file.
//!
//! ```toml
//! workers = 4
//! threads = 8
//! sequence_length = 40
//! motif_length = 8
//! ```

use crate::error::{MotifError, Result};
use crate::types::{CHIP_SEQ_LENGTH, MOTIF_LENGTH};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Number of in-process worker ranks
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Scan threads per worker rank (0 = rayon default)
    #[serde(default)]
    pub threads: usize,

    /// Required length of every input sequence
    #[serde(default = "default_sequence_length")]
    pub sequence_length: usize,

    /// Required length of every motif pattern
    #[serde(default = "default_motif_length")]
    pub motif_length: usize,
}

fn default_workers() -> usize {
    1
}

fn default_sequence_length() -> usize {
    CHIP_SEQ_LENGTH
}

fn default_motif_length() -> usize {
    MOTIF_LENGTH
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            workers: default_workers(),
            threads: 0,
            sequence_length: default_sequence_length(),
            motif_length: default_motif_length(),
        }
    }
}

impl ScanConfig {
    /// Reads `path` when given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    MotifError::Config(format!("failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&content)?
            }
            None => ScanConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(MotifError::invalid_parameter(
                "workers",
                self.workers,
                "at least one worker is required",
            ));
        }
        if self.sequence_length == 0 {
            return Err(MotifError::invalid_parameter(
                "sequence_length",
                self.sequence_length,
                "must be positive",
            ));
        }
        if self.motif_length == 0 {
            return Err(MotifError::invalid_parameter(
                "motif_length",
                self.motif_length,
                "must be positive",
            ));
        }
        Ok(())
    }
}
