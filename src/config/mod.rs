// Configuration management module
// TOML settings plus environment overrides for provider credentials

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{AnswerConfig, Config, ConfigError, PathsConfig, ProviderConfig};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_config_dir()
}
