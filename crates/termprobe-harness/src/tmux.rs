//! tmux backend.
//!
//! Each session is a detached tmux window running the configured shell.
//! Keys go in through `tmux send-keys`; the screen comes out through
//! `capture-pane` into a named buffer followed by `save-buffer` to a scratch
//! file, which is read and removed.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tempfile::TempDir;
use termprobe_types::HarnessConfig;
use tracing::debug;

use crate::backend::{CaptureMode, SessionId, TerminalBackend};
use crate::error::HarnessError;

/// Check whether `binary` runs as a tmux executable.
pub fn tmux_available(binary: &str) -> bool {
    Command::new(binary)
        .arg("-V")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Drives windows on the tmux server reachable from this process.
pub struct TmuxBackend {
    binary: String,
    /// Session new windows are created in; `None` lets tmux choose.
    target_session: Option<String>,
    /// Holds exported pane captures. Removed on drop.
    scratch: TempDir,
}

impl TmuxBackend {
    /// Create a backend using the tmux binary and session from `config`.
    pub fn new(config: &HarnessConfig) -> Result<Self, HarnessError> {
        let scratch = tempfile::Builder::new().prefix("termprobe-").tempdir()?;
        Ok(Self {
            binary: config.tmux_binary.clone(),
            target_session: config.tmux_session.clone(),
            scratch,
        })
    }

    /// Whether this backend's binary is usable.
    pub fn is_available(&self) -> bool {
        tmux_available(&self.binary)
    }

    /// Run one tmux command and return its stdout.
    fn run(&self, args: &[&str]) -> Result<String, HarnessError> {
        let command_line = format!("{} {}", self.binary, args.join(" "));
        debug!(command = %command_line, "tmux");
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| HarnessError::Backend {
                command: command_line.clone(),
                stderr: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(HarnessError::Backend {
                command: command_line,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn pane_target(session: &SessionId, pane: Option<u32>) -> String {
        match pane {
            Some(p) => format!("{session}.{p}"),
            None => session.to_string(),
        }
    }

    fn buffer_name(session: &SessionId) -> String {
        format!("termprobe-{}", session.as_str().trim_start_matches('@'))
    }

    fn capture_path(&self, buffer: &str) -> PathBuf {
        self.scratch.path().join(format!("{buffer}.txt"))
    }
}

impl TerminalBackend for TmuxBackend {
    fn create_session(&self, shell_command: &str) -> Result<SessionId, HarnessError> {
        let name = format!("termprobe-{}", uuid::Uuid::new_v4().simple());
        let target = self.target_session.as_ref().map(|s| format!("{s}:"));

        let mut args = vec!["new-window", "-d", "-P", "-F", "#{window_id}", "-n", name.as_str()];
        if let Some(ref t) = target {
            args.extend(["-t", t.as_str()]);
        }
        args.push(shell_command);

        let window_id = self
            .run(&args)
            .map_err(|e| HarnessError::Setup(e.to_string()))?
            .trim()
            .to_string();
        if window_id.is_empty() {
            return Err(HarnessError::Setup(
                "tmux new-window printed no window id".to_string(),
            ));
        }
        let id = SessionId(window_id);

        self.run(&["set-window-option", "-t", id.as_str(), "pane-base-index", "0"])
            .map_err(|e| HarnessError::Setup(e.to_string()))?;
        Ok(id)
    }

    fn send_keys(
        &self,
        session: &SessionId,
        pane: Option<u32>,
        key: &str,
    ) -> Result<(), HarnessError> {
        let target = Self::pane_target(session, pane);
        self.run(&["send-keys", "-t", target.as_str(), key])?;
        Ok(())
    }

    fn capture_pane(
        &self,
        session: &SessionId,
        pane: u32,
        mode: CaptureMode,
    ) -> Result<String, HarnessError> {
        let target = Self::pane_target(session, Some(pane));
        let buffer = Self::buffer_name(session);
        let path = self.capture_path(&buffer);
        let path_str = path.to_string_lossy().into_owned();

        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        let mut args = vec!["capture-pane"];
        if mode == CaptureMode::Colored {
            args.push("-e");
        }
        args.extend(["-J", "-b", buffer.as_str(), "-t", target.as_str()]);
        self.run(&args)?;
        self.run(&["save-buffer", "-b", buffer.as_str(), path_str.as_str()])?;
        // The buffer is only a transfer slot; a failed delete leaves it to
        // be overwritten by the next capture.
        let _ = self.run(&["delete-buffer", "-b", buffer.as_str()]);

        let content = std::fs::read_to_string(&path)?;
        std::fs::remove_file(&path)?;
        Ok(content)
    }

    fn paste(&self, session: &SessionId, text: &str) -> Result<(), HarnessError> {
        let buffer = format!("{}-paste", Self::buffer_name(session));
        self.run(&["set-buffer", "-b", buffer.as_str(), text])?;
        self.run(&["paste-buffer", "-d", "-b", buffer.as_str(), "-t", session.as_str()])?;
        Ok(())
    }

    fn destroy_session(&self, session: &SessionId) -> Result<(), HarnessError> {
        self.run(&["kill-window", "-t", session.as_str()])?;
        Ok(())
    }
}
