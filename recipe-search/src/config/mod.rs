//! Configuration and dependency wiring for the command line.

mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::{AppConfig, ConfigOverrides, LogFormat};
