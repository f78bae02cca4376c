//! Shared helpers for integration tests.
//!
//! Each integration test file compiles common/ as its own module, so not
//! every helper is used in every file.
#![allow(dead_code)]

use std::path::Path;

use termprobe::HarnessConfig;

/// Install a test-writer subscriber once per binary. `RUST_LOG` selects
/// the level; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Defaults tightened for the in-memory backend: no key delay, short waits,
/// artifacts under `dir`.
pub fn fast_config(dir: &Path) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.key_delay_ms = 0;
    config.poll.interval_ms = 2;
    config.poll.timeout_ms = 500;
    config.capture.retry_interval_ms = 1;
    config.capture.retry_timeout_ms = 50;
    config.artifact.base_path = dir.join("output");
    config.artifact.poll_interval_ms = 2;
    config.artifact.timeout_ms = 200;
    config
}

/// Defaults for a real tmux server, with artifacts under `dir`.
pub fn tmux_config(dir: &Path) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.artifact.base_path = dir.join("output");
    config
}

/// A status line in the plain shape: `matched/total cursor/hscroll`, with
/// the settled marker when `settled`.
pub fn status(matched: u64, total: u64, settled: bool) -> String {
    format!(
        "  {matched}/{total} 0/0{}",
        if settled { "." } else { "" }
    )
}
