//! Configuration loading

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Find a config file by walking up the directory tree, then checking
/// global config.
///
/// Search order:
/// 1. Current directory and parent directories (walking up to root)
/// 2. Global config at ~/.config/riskflow/
fn find_config_file(filename: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("riskflow").join(filename);
        if global_path.exists() {
            return Some(global_path);
        }
    }

    None
}

/// Text-generation provider settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama server URL
    pub url: String,

    /// Primary model
    pub model: String,

    /// Optional fallback model tried when the primary fails
    pub fallback_model: Option<String>,

    /// Per-call generation timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            fallback_model: None,
            timeout_secs: 300,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Application configuration (.riskflow.toml)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,

    /// Database path; defaults to ~/.riskflow/riskflow.db when absent
    pub db_path: Option<PathBuf>,
}

impl Config {
    /// Load config, falling back to defaults when no file is found.
    ///
    /// Search order: walk up from cwd looking for `.riskflow.toml`, then
    /// `~/.config/riskflow/.riskflow.toml`.
    pub fn load() -> Result<Self> {
        if let Some(path) = find_config_file(".riskflow.toml") {
            tracing::debug!("Loading config from: {}", path.display());
            return Self::load_from_path(&path);
        }

        tracing::debug!("No .riskflow.toml found, using defaults");
        Ok(Self::default())
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
