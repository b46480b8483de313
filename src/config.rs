//! Service configuration.
//!
//! Loaded from TOML, with every field optional. API keys are never read
//! from the file; they come from the environment through [`Secrets`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kibble_search::http::build_api_client;
use kibble_search::providers::openai::DEFAULT_MODEL;
use kibble_search::{
    Estimator, Extractor, ExtractorKind, LlmExtractor, OpenAiConfig, OpenAiProvider,
    PatternExtractor, PipelineConfig, ReqwestFetcher, SourcePolicy, TavilyConfig, TavilyProvider,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, ServiceError};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "KIBBLE_CONFIG";
/// Environment variable overriding [`ServerConfig::host`].
pub const HOST_ENV: &str = "KIBBLE_HOST";
/// Environment variable overriding [`ServerConfig::port`].
pub const PORT_ENV: &str = "KIBBLE_PORT";
/// Environment variable holding the Tavily API key.
pub const TAVILY_KEY_ENV: &str = "TAVILY_API_KEY";
/// Environment variable holding the OpenAI API key.
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Limits and timeouts for the estimation pipeline.
    pub pipeline: PipelineConfig,
    /// Extraction strategy.
    pub extractor: ExtractorConfig,
    /// Ranking lists.
    pub sources: SourcePolicy,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host/IP to bind to.
    pub host: String,
    /// Port to bind to. Use `0` to let the OS assign one.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8787,
        }
    }
}

/// Extraction strategy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Which extractor runs.
    pub kind: ExtractorKind,
    /// Chat model used by the `llm` extractor.
    pub model: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            kind: ExtractorKind::default(),
            model: DEFAULT_MODEL.to_owned(),
        }
    }
}

/// Provider credentials, read from the environment only.
#[derive(Clone, Default)]
pub struct Secrets {
    /// Tavily API key.
    pub tavily_api_key: Option<String>,
    /// OpenAI API key.
    pub openai_api_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("tavily_api_key", &self.tavily_api_key.as_ref().map(|_| "<set>"))
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl Secrets {
    /// Read credentials from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            tavily_api_key: read(TAVILY_KEY_ENV),
            openai_api_key: read(OPENAI_KEY_ENV),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))
    }

    /// Load the file named by `KIBBLE_CONFIG` (or the default path) and
    /// apply environment overrides. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be parsed, an override
    /// is malformed, or the result fails validation.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// [`ServiceConfig::load`] with an injectable environment.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceConfig::load`].
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = lookup(CONFIG_PATH_ENV)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_config_path);

        let mut config = if path.exists() {
            tracing::info!(path = %path.display(), "loading config");
            Self::from_file(&path)?
        } else {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `KIBBLE_HOST` / `KIBBLE_PORT` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] if the port is not a valid number.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = lookup(HOST_ENV).filter(|h| !h.trim().is_empty()) {
            self.server.host = host.trim().to_owned();
        }
        if let Some(port) = lookup(PORT_ENV).filter(|p| !p.trim().is_empty()) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| ServiceError::Config(format!("{PORT_ENV}={port}: {e}")))?;
        }
        Ok(())
    }

    /// Validate the pipeline limits and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Search`] wrapping the pipeline's complaint.
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        if self.extractor.model.trim().is_empty() {
            return Err(ServiceError::Config("extractor.model must not be empty".into()));
        }
        Ok(())
    }

    /// Returns the default config file path: `~/.config/kibble-density/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("kibble-density").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("kibble-density")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/kibble-density/config.toml")
        }
    }

    /// Build an [`Estimator`] backed by Tavily, reqwest liveness checks and
    /// the configured extractor.
    ///
    /// Missing keys are logged, not fatal: requests then degrade to the
    /// fallback density.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built or the pipeline
    /// configuration is invalid.
    pub fn build_estimator(&self, secrets: &Secrets, cancel: CancellationToken) -> Result<Estimator> {
        let api_client = build_api_client(&self.pipeline)?;

        if secrets.tavily_api_key.is_none() {
            tracing::warn!("{TAVILY_KEY_ENV} is not set; every estimate will use the fallback density");
        }
        let search = TavilyProvider::new(
            TavilyConfig::new(secrets.tavily_api_key.clone().unwrap_or_default()),
            api_client.clone(),
        );

        let extractor: Arc<dyn Extractor> = match self.extractor.kind {
            ExtractorKind::Patterns => Arc::new(PatternExtractor),
            ExtractorKind::Llm => {
                if secrets.openai_api_key.is_none() {
                    tracing::warn!("{OPENAI_KEY_ENV} is not set; the llm extractor will always fall back");
                }
                let provider = OpenAiProvider::new(
                    OpenAiConfig::new(
                        secrets.openai_api_key.clone().unwrap_or_default(),
                        self.extractor.model.clone(),
                    ),
                    api_client,
                );
                Arc::new(LlmExtractor::new(Arc::new(provider)))
            }
        };

        let fetcher = ReqwestFetcher::from_config(&self.pipeline)?;

        tracing::info!(
            extractor = %self.extractor.kind,
            max_sources = self.pipeline.max_sources,
            cache_ttl_seconds = self.pipeline.cache_ttl_seconds,
            "estimator ready"
        );

        Ok(Estimator::new(Arc::new(search), Arc::new(fetcher), extractor, self.pipeline.clone())?
            .with_policy(self.sources.clone())
            .with_cancellation(cancel))
    }
}
