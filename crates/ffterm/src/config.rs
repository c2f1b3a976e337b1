//! Shell configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::END_OF_RUN_MARKER;
use crate::sync::{HOUSEKEEPING_ENTRIES, StagingPolicy};

/// Errors loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid configuration JSON
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Shell configuration
///
/// Every field has a default, so a configuration file only needs the
/// fields it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Prompt prefix written before each command line
    pub prompt: String,
    /// Column width command names are padded to in `help`
    pub help_column_width: usize,
    /// Name of the processing command, stripped from the engine arguments
    pub engine_keyword: String,
    /// `help` description of the processing command
    pub engine_description: String,
    /// Root entries always present in the engine filesystem
    pub housekeeping_entries: Vec<String>,
    /// Engine log messages never shown on the surface
    pub suppressed_log_messages: Vec<String>,
    /// Line written while the engine loads
    pub loading_message: String,
    /// How command lines are matched against staged file names
    pub staging_policy: StagingPolicy,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: "$ ".to_string(),
            help_column_width: 15,
            engine_keyword: "ffmpeg".to_string(),
            engine_description: "Hyper fast Audio and Video encoder".to_string(),
            housekeeping_entries: HOUSEKEEPING_ENTRIES.iter().map(|s| s.to_string()).collect(),
            suppressed_log_messages: vec![END_OF_RUN_MARKER.to_string()],
            loading_message: "loading ffmpeg wasm...".to_string(),
            staging_policy: StagingPolicy::default(),
        }
    }
}

impl ShellConfig {
    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Returns true if an engine log message should be hidden.
    pub fn is_suppressed(&self, message: &str) -> bool {
        self.suppressed_log_messages.iter().any(|m| m == message)
    }
}
