#[cfg(feature = "cli")]
pub mod cli;
pub mod settings;
pub mod toml_config;

pub use settings::{CacheSettings, Settings};
pub use toml_config::TomlConfig;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
