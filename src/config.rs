//! Optional JSON configuration.
//!
//! Looked up at `<config_dir>/study-buddy/config.json`. Every field is
//! optional; a missing file means defaults. Precedence, highest first:
//! command-line flags, `STUDY_BUDDY_API_KEY`, the config file.

use crate::error::BuddyError;
use crate::llm::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "config.json";

pub const API_KEY_ENV: &str = "STUDY_BUDDY_API_KEY";

const APP_DIR: &str = "study-buddy";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Key for the AI backend; absent keeps the assistant offline
    pub api_key: Option<String>,

    /// Chat-completions URL
    pub endpoint: Option<String>,

    pub model: Option<String>,

    /// Where per-user memory files live
    pub memory_dir: Option<PathBuf>,

    /// `lite`, `cs` or a path to a catalog JSON file
    pub catalog: Option<String>,
}

impl Config {
    /// `<config_dir>/study-buddy/config.json`
    pub fn default_path() -> Result<PathBuf, BuddyError> {
        let dir = dirs::config_dir().ok_or(BuddyError::NoHomeDir)?;
        Ok(dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Parse `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, BuddyError> {
        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| BuddyError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| BuddyError::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Let an environment-provided key replace the file's key.
    pub fn with_env_key(mut self, env_key: Option<String>) -> Self {
        if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}
