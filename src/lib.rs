//! Black-box tmux driver for end-to-end testing of interactive terminal
//! programs.
//!
//! Re-exports the harness and its configuration types. See
//! [`termprobe_harness`] for the session API and [`types`] for
//! [`HarnessConfig`] and its layered loader.

pub use termprobe_harness::*;
pub use termprobe_types as types;
pub use termprobe_types::{ConfigLoader, HarnessConfig, ProbeError, ShellProfile};

/// Load the effective configuration for the current directory.
///
/// Merges built-in defaults, `~/.termprobe/config.toml`,
/// `./.termprobe/config.toml` and `TERMPROBE_*` environment variables.
pub fn load_config() -> Result<HarnessConfig, ProbeError> {
    Ok(ConfigLoader::new().load()?.config)
}
