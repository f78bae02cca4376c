//! Harness configuration.
//!
//! Every tunable the driver uses (timeouts, poll intervals, the artifact
//! base path, the shell profile) lives in [`HarnessConfig`], which is
//! passed explicitly into sessions and artifact exchanges. Durations are
//! stored as milliseconds so the struct round-trips through TOML.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ProbeError;

/// Name of the config file looked up in the user and workspace directories.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Shell started inside each tmux window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShellProfile {
    /// `bash` with no rc file.
    #[default]
    Bash,
    /// `zsh -f` with a bounded history.
    Zsh,
}

impl ShellProfile {
    /// The command line that starts this shell with minimal startup noise.
    pub fn command(&self) -> &'static str {
        match self {
            ShellProfile::Bash => "PS1= PROMPT_COMMAND= bash --rcfile None",
            ShellProfile::Zsh => "PS1= PROMPT_COMMAND= HISTSIZE=100 zsh -f",
        }
    }

    /// Parse a profile name (`bash` or `zsh`, case-insensitive).
    pub fn parse(name: &str) -> Result<Self, ProbeError> {
        match name.to_ascii_lowercase().as_str() {
            "bash" => Ok(ShellProfile::Bash),
            "zsh" => Ok(ShellProfile::Zsh),
            other => Err(ProbeError::ConfigError(format!(
                "unknown shell profile {other:?} (expected bash or zsh)"
            ))),
        }
    }
}

/// Settings for the generic poll loop used by screen waits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollConfig {
    /// Sleep between attempts, in milliseconds.
    pub interval_ms: u64,
    /// Upper bound for a single wait, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 20,
            timeout_ms: 10_000,
        }
    }
}

/// Retry settings for pane capture, which can fail transiently while tmux
/// is still creating the pane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Sleep between capture attempts, in milliseconds.
    pub retry_interval_ms: u64,
    /// Give up on capture after this long, in milliseconds.
    pub retry_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: 10,
            retry_timeout_ms: 1_000,
        }
    }
}

/// Where artifacts written by the tested program are expected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactConfig {
    /// Path prefix; artifacts live at `{base_path}-{test}-{suffix}`.
    pub base_path: PathBuf,
    /// How long to wait for an artifact to appear, in milliseconds.
    pub timeout_ms: u64,
    /// Interval between existence checks, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            base_path: std::env::temp_dir().join("termprobe-output"),
            timeout_ms: 10_000,
            poll_interval_ms: 20,
        }
    }
}

/// Top-level configuration for a harness run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HarnessConfig {
    /// tmux executable name or path.
    pub tmux_binary: String,
    /// tmux session to create windows in. `None` uses the current/default one.
    pub tmux_session: Option<String>,
    /// Shell started in each window.
    pub shell: ShellProfile,
    /// Environment variables unset before the shell starts.
    pub unset_env: Vec<String>,
    /// Delay after each key sent, in milliseconds.
    pub key_delay_ms: u64,
    /// Key sent after a successful wait when a refresh is requested.
    pub refresh_key: String,
    /// Text typed by `prepare` to resynchronise with the shell.
    pub prepare_sentinel: String,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub artifact: ArtifactConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            tmux_binary: "tmux".to_string(),
            tmux_session: None,
            shell: ShellProfile::Bash,
            unset_env: vec![
                "SKIM_DEFAULT_COMMAND".to_string(),
                "SKIM_DEFAULT_OPTIONS".to_string(),
                "HISTFILE".to_string(),
            ],
            key_delay_ms: 10,
            refresh_key: "C-L".to_string(),
            prepare_sentinel: "hello".to_string(),
            poll: PollConfig::default(),
            capture: CaptureConfig::default(),
            artifact: ArtifactConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ProbeError> {
        toml::from_str(content).map_err(|e| ProbeError::ConfigError(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ProbeError> {
        toml::to_string_pretty(self).map_err(|e| ProbeError::ConfigError(e.to_string()))
    }

    pub fn key_delay(&self) -> Duration {
        Duration::from_millis(self.key_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.poll.timeout_ms)
    }

    pub fn capture_retry_interval(&self) -> Duration {
        Duration::from_millis(self.capture.retry_interval_ms)
    }

    pub fn capture_retry_timeout(&self) -> Duration {
        Duration::from_millis(self.capture.retry_timeout_ms)
    }

    pub fn artifact_timeout(&self) -> Duration {
        Duration::from_millis(self.artifact.timeout_ms)
    }

    pub fn artifact_poll_interval(&self) -> Duration {
        Duration::from_millis(self.artifact.poll_interval_ms)
    }

    /// The full command line tmux runs in a new window: unset the
    /// configured variables, then start the shell profile.
    pub fn shell_command(&self) -> String {
        if self.unset_env.is_empty() {
            return self.shell.command().to_string();
        }
        format!("unset {}; {}", self.unset_env.join(" "), self.shell.command())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = HarnessConfig::default();
        assert_eq!(config.key_delay(), Duration::from_millis(10));
        assert_eq!(config.poll_interval(), Duration::from_millis(20));
        assert_eq!(config.wait_timeout(), Duration::from_secs(10));
        assert_eq!(config.refresh_key, "C-L");
        assert_eq!(config.shell, ShellProfile::Bash);
    }

    #[test]
    fn shell_command_unsets_before_starting_shell() {
        let config = HarnessConfig::default();
        assert_eq!(
            config.shell_command(),
            "unset SKIM_DEFAULT_COMMAND SKIM_DEFAULT_OPTIONS HISTFILE; \
             PS1= PROMPT_COMMAND= bash --rcfile None"
        );
    }

    #[test]
    fn shell_command_without_unsets() {
        let config = HarnessConfig {
            shell: ShellProfile::Zsh,
            unset_env: Vec::new(),
            ..HarnessConfig::default()
        };
        assert_eq!(config.shell_command(), "PS1= PROMPT_COMMAND= HISTSIZE=100 zsh -f");
    }

    #[test]
    fn toml_roundtrip_preserves_sections() {
        let mut config = HarnessConfig::default();
        config.poll.timeout_ms = 2_500;
        config.tmux_session = Some("e2e".into());
        let text = config.to_toml().unwrap();
        let parsed = HarnessConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn shell_profile_parse() {
        assert_eq!(ShellProfile::parse("ZSH").unwrap(), ShellProfile::Zsh);
        assert!(ShellProfile::parse("fish").is_err());
    }
}
