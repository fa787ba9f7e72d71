//! Engine configuration.
//!
//! [`EngineConfig`] is plain data; [`ConfigLoader`] layers a TOML file and
//! `WEFT_*` environment variables over the defaults.

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::{EngineConfig, GcConfig, ResolutionConfig};
