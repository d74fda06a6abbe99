//! Configuration
//!
//! - `ConfigFile`: the YAML document (backends, tool servers, turn limits)
//! - `FileConfigProvider`: YAML file (user, workspace or explicit path)

mod error;
mod file;

pub use error::{ConfigError, ConfigResult};
pub use file::{ConfigFile, ConfigLevel, FileConfigProvider};
