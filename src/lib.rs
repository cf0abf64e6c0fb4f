// OpenFIRE configuration tool - shared library
// Config file handling and text rendering used by the `openfire` binary

pub mod config;
pub mod format;

pub use config::{AppConfig, ConfigError, FieldModeSetting};
