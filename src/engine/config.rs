//! Executor configuration and its JSON persistence

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::error::EngineError;

/// Configuration for an [`Executor`](super::executor::Executor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum number of nested composites alive at once; unbounded when `None`
    ///
    /// A composite entered as the last step of an exhausted composite replaces it
    /// rather than nesting, so interpreter-driven loops never count against this
    pub max_depth: Option<usize>,

    /// Yield to the tokio scheduler after every synchronous step
    pub yield_between_steps: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            yield_between_steps: true,
        }
    }
}

impl ExecutorConfig {
    /// Reject settings no execution could run under
    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        if self.max_depth == Some(0) {
            return Err(EngineError::Config(
                "max_depth must allow at least the top-level composite".into(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let data =
            fs::read(path).with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: ExecutorConfig =
            serde_json::from_slice(&data).context("Failed to deserialize config")?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration as pretty JSON
    ///
    /// Writes a temporary sibling first, then renames it over `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).context("Failed to serialize config")?;

        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;
        file.write_all(&json).context("Failed to write config")?;
        file.sync_all().context("Failed to sync config")?;
        drop(file);

        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;
        Ok(())
    }
}
