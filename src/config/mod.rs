// Configuration management module
// TOML settings file plus PINECONE_* environment overrides

pub mod display;
pub mod settings;


pub use display::show_config;
pub use settings::{
    API_KEY_ENV, Config, ConfigError, EmbeddingConfig, INDEX_HOST_ENV, INDEX_NAME_ENV,
    NotesConfig, PineconeConfig, ServerConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
