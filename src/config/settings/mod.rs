
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const API_KEY_ENV: &str = "AZURE_OPENAI_API_KEY";
pub const ENDPOINT_ENV: &str = "AZURE_OPENAI_ENDPOINT";
pub const EMBEDDING_DEPLOYMENT_ENV: &str = "AZURE_OPENAI_DEPLOYMENT_EMBEDDING";
pub const CHAT_DEPLOYMENT_ENV: &str = "AZURE_DEPLOYMENT";
pub const API_VERSION_ENV: &str = "AZURE_OPENAI_VERSION";

pub const DEFAULT_DECLINE_MESSAGE: &str = "I’m not confident I know the answer to that. Could you please rephrase or ask something else?";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Connection settings shared by the embedding and chat deployments.
///
/// Index construction and online queries must run with the same
/// endpoint, embedding deployment and API version. Vectors from a
/// different deployment live in an unrelated space.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub api_version: String,
    pub embedding_deployment: String,
    pub chat_deployment: String,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    /// Read from the environment only; never written to disk.
    #[serde(skip)]
    pub api_key: Option<String>,
}

/// Tuning for the answer step.
///
/// `confidence_threshold` is a squared-L2 distance calibrated for one
/// embedding model and corpus. Recalibrate it after switching models:
/// compare distances of known paraphrases against unrelated questions
/// (`faq-bot related` prints them) and pick a value between the two groups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnswerConfig {
    pub confidence_threshold: f32,
    pub temperature: f32,
    pub max_tokens: u32,
    pub related_questions: usize,
    pub fallback_to_stored_answer: bool,
    pub decline_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub corpus: PathBuf,
    pub artifacts_dir: PathBuf,
}

impl Default for ProviderConfig {
    #[inline]
    fn default() -> Self {
        Self {
            endpoint: "https://example.openai.azure.com".to_string(),
            api_version: "2023-05-15".to_string(),
            embedding_deployment: "text-embedding-ada-002".to_string(),
            chat_deployment: "gpt-35-turbo".to_string(),
            timeout_seconds: 30,
            retry_attempts: 1,
            api_key: None,
        }
    }
}

impl Default for AnswerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            temperature: 0.3,
            max_tokens: 512,
            related_questions: 5,
            fallback_to_stored_answer: false,
            decline_message: DEFAULT_DECLINE_MESSAGE.to_string(),
        }
    }
}

impl Default for PathsConfig {
    #[inline]
    fn default() -> Self {
        Self {
            corpus: PathBuf::from("data/faqs.json"),
            artifacts_dir: PathBuf::from("embeddings"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid endpoint scheme: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid deployment name: {0:?} (cannot be empty)")]
    InvalidDeployment(String),
    #[error("Invalid API version: {0:?} (cannot be empty)")]
    InvalidApiVersion(String),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("Invalid confidence threshold: {0} (must be a finite, non-negative distance)")]
    InvalidThreshold(f32),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid max tokens: {0} (must be between 1 and 32768)")]
    InvalidMaxTokens(u32),
    #[error("Invalid related question count: {0} (must be between 1 and 50)")]
    InvalidRelatedQuestions(usize),
    #[error("{0} is not set")]
    MissingApiKey(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default configuration rooted at `base_dir`
    #[inline]
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            provider: ProviderConfig::default(),
            answer: AnswerConfig::default(),
            paths: PathsConfig::default(),
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// `~/.faq-bot`
    #[inline]
    pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".faq-bot"))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from `config_dir`, then apply `.env` and process
    /// environment overrides.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        let mut config = Self::load_file(config_dir)?;
        config.apply_overrides(|key| std::env::var(key).ok());

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Load `config.toml` without consulting the environment
    #[inline]
    pub fn load_file<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self::with_base_dir(config_dir));
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Apply environment-style overrides from `lookup`.
    ///
    /// Variable names match the ones the deployment's `.env` files use.
    #[inline]
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(endpoint) = non_empty(ENDPOINT_ENV) {
            self.provider.endpoint = endpoint;
        }
        if let Some(deployment) = non_empty(EMBEDDING_DEPLOYMENT_ENV) {
            self.provider.embedding_deployment = deployment;
        }
        if let Some(deployment) = non_empty(CHAT_DEPLOYMENT_ENV) {
            self.provider.chat_deployment = deployment;
        }
        if let Some(version) = non_empty(API_VERSION_ENV) {
            self.provider.api_version = version;
        }
        if let Some(key) = non_empty(API_KEY_ENV) {
            self.provider.api_key = Some(key);
        }
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Corpus file, resolved against the config directory when relative
    #[inline]
    pub fn corpus_path(&self) -> PathBuf {
        self.resolve(&self.paths.corpus)
    }

    /// Directory holding the index, metadata and manifest artifacts
    #[inline]
    pub fn artifacts_dir(&self) -> PathBuf {
        self.resolve(&self.paths.artifacts_dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.get_base_dir().join(path)
        }
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider.validate()?;
        self.answer.validate()?;
        Ok(())
    }
}

impl ProviderConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.endpoint)
            .map_err(|_| ConfigError::InvalidUrl(self.endpoint.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidProtocol(url.scheme().to_string()));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ConfigError::InvalidUrl(self.endpoint.clone()));
        }

        if self.embedding_deployment.trim().is_empty() {
            return Err(ConfigError::InvalidDeployment(
                self.embedding_deployment.clone(),
            ));
        }
        if self.chat_deployment.trim().is_empty() {
            return Err(ConfigError::InvalidDeployment(self.chat_deployment.clone()));
        }
        if self.api_version.trim().is_empty() {
            return Err(ConfigError::InvalidApiVersion(self.api_version.clone()));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }
        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }

        Ok(())
    }

    #[inline]
    pub fn embeddings_url(&self) -> Result<Url, ConfigError> {
        self.deployment_url(&self.embedding_deployment, "embeddings")
    }

    #[inline]
    pub fn chat_url(&self) -> Result<Url, ConfigError> {
        self.deployment_url(&self.chat_deployment, "chat/completions")
    }

    fn deployment_url(&self, deployment: &str, operation: &str) -> Result<Url, ConfigError> {
        let url_str = format!(
            "{}/openai/deployments/{}/{}",
            self.endpoint.trim_end_matches('/'),
            deployment,
            operation
        );
        let mut url = Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    /// Identifies the vector space an index was built in
    #[inline]
    pub fn embedding_fingerprint(&self) -> String {
        format!("{}@{}", self.embedding_deployment, self.api_version)
    }

    #[inline]
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingApiKey(API_KEY_ENV))
    }

    #[inline]
    pub fn set_endpoint(&mut self, endpoint: String) -> Result<(), ConfigError> {
        let temp_config = ProviderConfig {
            endpoint: endpoint.clone(),
            ..self.clone()
        };
        temp_config.validate()?;
        self.endpoint = endpoint;
        Ok(())
    }

    #[inline]
    pub fn set_embedding_deployment(&mut self, deployment: String) -> Result<(), ConfigError> {
        if deployment.trim().is_empty() {
            return Err(ConfigError::InvalidDeployment(deployment));
        }
        self.embedding_deployment = deployment;
        Ok(())
    }

    #[inline]
    pub fn set_chat_deployment(&mut self, deployment: String) -> Result<(), ConfigError> {
        if deployment.trim().is_empty() {
            return Err(ConfigError::InvalidDeployment(deployment));
        }
        self.chat_deployment = deployment;
        Ok(())
    }

    #[inline]
    pub fn set_api_version(&mut self, version: String) -> Result<(), ConfigError> {
        if version.trim().is_empty() {
            return Err(ConfigError::InvalidApiVersion(version));
        }
        self.api_version = version;
        Ok(())
    }
}

impl AnswerConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.confidence_threshold.is_finite() || self.confidence_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.confidence_threshold));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }
        if !(1..=32768).contains(&self.max_tokens) {
            return Err(ConfigError::InvalidMaxTokens(self.max_tokens));
        }
        if !(1..=50).contains(&self.related_questions) {
            return Err(ConfigError::InvalidRelatedQuestions(self.related_questions));
        }
        Ok(())
    }

    #[inline]
    pub fn set_confidence_threshold(&mut self, threshold: f32) -> Result<(), ConfigError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        self.confidence_threshold = threshold;
        Ok(())
    }
}
