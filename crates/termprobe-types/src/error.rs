//! Error types shared across all termprobe crates.

/// Errors raised while building or loading harness configuration.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
