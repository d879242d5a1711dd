//! Server configuration.

use crate::llm_client::{LlmConfig, LlmProvider};
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use strictly_codegrid::ChallengeCatalog;
use tracing::{debug, info, instrument};

/// Which verifier judges submissions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VerifierKind {
    /// Reference answers from the challenge catalog.
    Catalog,
    /// An LLM acting as judge.
    Llm,
}

/// Configuration for the game server.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Verifier used for submissions.
    #[serde(default = "default_verifier")]
    verifier: VerifierKind,

    /// TOML challenge catalog; the built-in catalog when absent.
    #[serde(default)]
    catalog_path: Option<PathBuf>,

    /// LLM provider for the judge (openai or anthropic).
    #[serde(default = "default_provider")]
    llm_provider: LlmProvider,

    /// LLM model name (e.g., "gpt-4o-mini", "claude-3-5-haiku-latest").
    #[serde(default = "default_model")]
    llm_model: String,

    /// Maximum tokens for judge replies.
    #[serde(default = "default_max_tokens")]
    llm_max_tokens: u32,

    /// Seconds to wait for a judge verdict before failing the attempt.
    #[serde(default = "default_judge_timeout_secs")]
    judge_timeout_secs: u64,
}

fn default_verifier() -> VerifierKind {
    VerifierKind::Catalog
}

fn default_provider() -> LlmProvider {
    LlmProvider::OpenAI
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    64
}

fn default_judge_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            verifier: default_verifier(),
            catalog_path: None,
            llm_provider: default_provider(),
            llm_model: default_model(),
            llm_max_tokens: default_max_tokens(),
            judge_timeout_secs: default_judge_timeout_secs(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml_str(&content)?;
        info!(verifier = %config.verifier, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))
    }

    /// Loads `path` when it exists, the defaults otherwise.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            info!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Replaces the configured verifier.
    pub fn with_verifier(mut self, verifier: VerifierKind) -> Self {
        self.verifier = verifier;
        self
    }

    /// Judge timeout as a duration.
    pub fn judge_timeout(&self) -> Duration {
        Duration::from_secs(self.judge_timeout_secs)
    }

    /// Loads the configured challenge catalog.
    #[instrument(skip(self))]
    pub fn load_catalog(&self) -> Result<ChallengeCatalog, ConfigError> {
        match &self.catalog_path {
            Some(path) => ChallengeCatalog::from_file(path)
                .map_err(|e| ConfigError::new(format!("Failed to load catalog: {}", e.message))),
            None => {
                debug!("Using built-in challenge catalog");
                Ok(ChallengeCatalog::builtin())
            }
        }
    }

    /// Creates the judge's LLM configuration.
    /// Requires OPENAI_API_KEY or ANTHROPIC_API_KEY environment variable.
    #[instrument(skip(self), fields(provider = %self.llm_provider, model = %self.llm_model))]
    pub fn create_llm_config(&self) -> Result<LlmConfig, ConfigError> {
        let var = self.llm_provider.api_key_var();
        let api_key = std::env::var(var)
            .map_err(|_| ConfigError::new(format!("{} environment variable not set", var)))?;

        Ok(LlmConfig::new(
            self.llm_provider,
            api_key,
            self.llm_model.clone(),
            self.llm_max_tokens,
        ))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(*config.verifier(), VerifierKind::Catalog);
        assert_eq!(*config.llm_provider(), LlmProvider::OpenAI);
        assert_eq!(config.judge_timeout(), Duration::from_secs(30));
        assert!(config.catalog_path().is_none());
    }

    #[test]
    fn test_parse_llm_judge_config() {
        let config = ServerConfig::from_toml_str(
            r#"
            verifier = "llm"
            llm_provider = "anthropic"
            llm_model = "claude-3-5-haiku-latest"
            judge_timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(*config.verifier(), VerifierKind::Llm);
        assert_eq!(*config.llm_provider(), LlmProvider::Anthropic);
        assert_eq!(config.llm_model(), "claude-3-5-haiku-latest");
        assert_eq!(config.judge_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_bad_config_is_error() {
        let err = ServerConfig::from_toml_str("verifier = \"oracle\"").unwrap_err();
        assert!(err.message.contains("Failed to parse config"));
    }

    #[test]
    fn test_missing_catalog_file_is_error() {
        let config =
            ServerConfig::from_toml_str("catalog_path = \"/nonexistent/catalog.toml\"").unwrap();
        assert!(config.load_catalog().is_err());
    }

    #[test]
    fn test_builtin_catalog_by_default() {
        let catalog = ServerConfig::default().load_catalog().unwrap();
        assert_eq!(catalog, ChallengeCatalog::builtin());
    }
}
