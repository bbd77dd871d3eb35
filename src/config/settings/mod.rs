
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::chunking::ChunkingConfig;
use crate::embeddings::inference::{DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, Truncate};
use crate::notes::NoteIdStrategy;

pub const API_KEY_ENV: &str = "PINECONE_API_KEY";
pub const INDEX_NAME_ENV: &str = "PINECONE_INDEX";
pub const INDEX_HOST_ENV: &str = "PINECONE_INDEX_HOST";

const DEFAULT_PINECONE_API_URL: &str = "https://api.pinecone.io";
const DEFAULT_API_VERSION: &str = "2025-01";
/// Per-request input limit of the hosted `multilingual-e5-large` model
const MAX_EMBED_BATCH_SIZE: usize = 96;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub pinecone: PineconeConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub notes: NotesConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PineconeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// Data-plane host of the index. Resolved through the control plane when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_host: Option<String>,
    pub controller_url: String,
    pub inference_url: String,
    pub api_version: String,
    pub namespace: String,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: None,
            index_host: None,
            controller_url: DEFAULT_PINECONE_API_URL.to_string(),
            inference_url: DEFAULT_PINECONE_API_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            namespace: String::new(),
            timeout_seconds: 30,
            retry_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: u32,
    pub truncate: Truncate,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            truncate: Truncate::End,
            batch_size: MAX_EMBED_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotesConfig {
    pub id_strategy: NoteIdStrategy,
    pub top_k: u32,
    pub upsert_batch_size: usize,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            id_strategy: NoteIdStrategy::Sequential,
            top_k: 100,
            upsert_batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid API version: {0} (cannot be empty)")]
    InvalidApiVersion(String),
    #[error("Invalid embedding dimension: {0} (must be between 1 and 20000)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid embedding batch size: {0} (must be between 1 and 96)")]
    InvalidEmbeddingBatchSize(usize),
    #[error("Invalid top_k: {0} (must be between 1 and 10000)")]
    InvalidTopK(u32),
    #[error("Invalid upsert batch size: {0} (must be between 1 and 1000)")]
    InvalidUpsertBatchSize(usize),
    #[error("Invalid timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry attempts: {0} (must be at least 1)")]
    InvalidRetryAttempts(u32),
    #[error("Pinecone index name is not configured (set {INDEX_NAME_ENV} or pinecone.index_name)")]
    MissingIndexName,
    #[error("Pinecone API key is not configured (set {API_KEY_ENV} or pinecone.api_key)")]
    MissingApiKey,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default configuration directory, `~/.note-search`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".note-search"))
            .or_else(|| dirs::config_dir().map(|dir| dir.join("note-search")))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Load from the default directory and apply `PINECONE_*` environment overrides
    #[inline]
    pub fn load_with_env() -> Result<Self> {
        let config_dir = Self::config_dir().context("Failed to determine config directory")?;
        let mut config = Self::load(config_dir)?;
        config
            .apply_overrides(|key| std::env::var(key).ok())
            .context("Invalid environment override")?;
        Ok(config)
    }

    /// Apply overrides for the API key, index name and index host.
    /// Empty values are ignored.
    #[inline]
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_key) = non_empty(API_KEY_ENV) {
            self.pinecone.api_key = Some(api_key);
        }
        if let Some(index_name) = non_empty(INDEX_NAME_ENV) {
            self.pinecone.index_name = Some(index_name);
        }
        if let Some(index_host) = non_empty(INDEX_HOST_ENV) {
            parse_host_url(&index_host)?;
            self.pinecone.index_host = Some(index_host);
        }

        Ok(())
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

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pinecone.validate()?;
        self.embedding.validate()?;
        self.notes.validate()?;
        self.server.validate()?;
        Ok(())
    }
}

impl PineconeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.controller_url()?;
        self.inference_url()?;
        if let Some(host) = &self.index_host {
            parse_host_url(host)?;
        }

        if self.api_version.trim().is_empty() {
            return Err(ConfigError::InvalidApiVersion(self.api_version.clone()));
        }

        if !(1..=300).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if self.retry_attempts == 0 {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }

        Ok(())
    }

    pub fn controller_url(&self) -> Result<Url, ConfigError> {
        parse_http_url(&self.controller_url)
    }

    pub fn inference_url(&self) -> Result<Url, ConfigError> {
        parse_http_url(&self.inference_url)
    }

    /// Configured data-plane URL, if any. Bare hostnames as returned by the
    /// control plane are treated as https.
    pub fn index_host_url(&self) -> Result<Option<Url>, ConfigError> {
        self.index_host
            .as_deref()
            .map(parse_host_url)
            .transpose()
    }

    pub fn require_index_name(&self) -> Result<&str, ConfigError> {
        self.index_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(ConfigError::MissingIndexName)
    }

    /// Pick the per-call key when given, otherwise the configured one
    pub fn resolve_api_key(&self, per_call: Option<&str>) -> Result<String, ConfigError> {
        let non_blank = |key: &&str| !key.trim().is_empty();
        per_call
            .filter(non_blank)
            .or_else(|| self.api_key.as_deref().filter(non_blank))
            .map(|key| key.trim().to_string())
            .ok_or(ConfigError::MissingApiKey)
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if !(1..=20_000).contains(&self.dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(self.dimension));
        }

        if !(1..=MAX_EMBED_BATCH_SIZE).contains(&self.batch_size) {
            return Err(ConfigError::InvalidEmbeddingBatchSize(self.batch_size));
        }

        Ok(())
    }
}

impl NotesConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=10_000).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        if !(1..=1000).contains(&self.upsert_batch_size) {
            return Err(ConfigError::InvalidUpsertBatchSize(self.upsert_batch_size));
        }

        Ok(())
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let address = format!("{}:{}", self.host, self.port);
        address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(address))
    }
}

/// Parse an index host, treating bare hostnames as https
pub(crate) fn parse_host_url(host: &str) -> Result<Url, ConfigError> {
    parse_http_url(&with_scheme(host))
}

fn with_scheme(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

fn parse_http_url(url_str: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(url_str).map_err(|_| ConfigError::InvalidUrl(url_str.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(url_str.to_string()));
    }
    Ok(url)
}
