// Configuration management module
// TOML settings file, command-line overrides and interactive setup

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, ConfigOverrides, DEFAULT_EMBEDDING_MODEL, EmbeddingConfig,
    EmbeddingProvider, OllamaConfig, RerankConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
