//! Error types for the harness crate.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur while driving a terminal session.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The backend could not create or configure the session.
    #[error("session setup failed: {0}")]
    Setup(String),
    /// Pane export kept failing until its retry budget ran out.
    #[error("pane capture failed after {attempts} attempts: {last_error}")]
    Capture {
        /// Number of capture attempts made.
        attempts: u32,
        /// The error reported by the last attempt.
        last_error: String,
    },
    /// A screen predicate never held within the timeout.
    #[error("timeout waiting for: {expected}\nScreen contents:\n{screen}")]
    Timeout {
        /// Description of what was expected (the caller's debug info).
        expected: String,
        /// The rendered screen at the time of timeout.
        screen: String,
    },
    /// An artifact file never appeared within the timeout.
    #[error("artifact {} did not appear within {waited:?}", .path.display())]
    ArtifactTimeout {
        /// The path that was polled.
        path: PathBuf,
        /// How long the harness waited.
        waited: Duration,
    },
    /// A backend command exited unsuccessfully.
    #[error("`{command}` failed: {stderr}")]
    Backend {
        /// The command line that failed.
        command: String,
        /// Captured standard error.
        stderr: String,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// An invalid regex pattern was provided.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
    #[error(transparent)]
    Config(#[from] termprobe_types::ProbeError),
}

impl HarnessError {
    /// Whether this error is a screen or artifact timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            HarnessError::Timeout { .. } | HarnessError::ArtifactTimeout { .. }
        )
    }
}
