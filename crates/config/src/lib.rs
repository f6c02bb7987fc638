// Configuration loading

pub mod settings;

pub use settings::{validate_date, ConfigError, LoadedSettings, Settings};
