//! Core types shared across termprobe crates.
//!
//! Defines the harness configuration, its layered loader, and the error
//! type both report through.

pub mod config;
pub mod config_loader;
pub mod error;

pub use config::{
    ArtifactConfig, CaptureConfig, HarnessConfig, PollConfig, ShellProfile, CONFIG_FILENAME,
};
pub use config_loader::{ConfigLoader, ConfigSource, EffectiveConfig, EnvMapping, ENV_MAPPINGS};
pub use error::ProbeError;
