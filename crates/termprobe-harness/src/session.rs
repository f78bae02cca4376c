//! Terminal session lifecycle: create, type, capture, wait, destroy.
//!
//! [`TerminalSession`] owns one backend window for the duration of a test.
//! It composes [`PollLoop`] twice: a short internal retry that makes pane
//! capture robust against transient backend failures, and the caller-facing
//! [`until`](TerminalSession::until) wait over screen snapshots.

use std::time::{Duration, Instant};

use termprobe_types::{HarnessConfig, ShellProfile};
use tracing::{debug, info, warn};

use crate::backend::{CaptureMode, SessionId, TerminalBackend};
use crate::error::HarnessError;
use crate::key::Key;
use crate::poll::PollLoop;
use crate::snapshot::ScreenSnapshot;

/// Options for a single [`until_with`](TerminalSession::until_with) wait.
#[derive(Debug, Clone, Default)]
pub struct UntilOptions {
    /// Overrides the configured wait timeout.
    pub timeout: Option<Duration>,
    /// Send the refresh key once the predicate holds.
    pub refresh: bool,
    /// Pane to capture.
    pub pane: u32,
    /// Extra context reported when the wait times out.
    pub debug_info: Option<String>,
}

impl UntilOptions {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn refresh(mut self) -> Self {
        self.refresh = true;
        self
    }

    #[must_use]
    pub fn pane(mut self, pane: u32) -> Self {
        self.pane = pane;
        self
    }

    #[must_use]
    pub fn debug_info(mut self, info: impl Into<String>) -> Self {
        self.debug_info = Some(info.into());
        self
    }
}

/// One isolated terminal window driven through a [`TerminalBackend`].
pub struct TerminalSession<B: TerminalBackend> {
    backend: B,
    id: SessionId,
    shell: ShellProfile,
    config: HarnessConfig,
    alive: bool,
}

impl<B: TerminalBackend> TerminalSession<B> {
    /// Create a window running the configured shell profile.
    pub fn create(backend: B, config: HarnessConfig) -> Result<Self, HarnessError> {
        let shell = config.shell;
        Self::create_with_shell(backend, config, shell)
    }

    /// Create a window running `shell`, overriding the configured profile.
    pub fn create_with_shell(
        backend: B,
        mut config: HarnessConfig,
        shell: ShellProfile,
    ) -> Result<Self, HarnessError> {
        config.shell = shell;
        let command = config.shell_command();
        let id = backend.create_session(&command)?;
        info!(session = %id, ?shell, "terminal session created");
        Ok(Self {
            backend,
            id,
            shell,
            config,
            alive: true,
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn shell(&self) -> ShellProfile {
        self.shell
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Send keys to the active pane, in order, pausing between them.
    pub fn send_keys(&self, keys: &[Key]) -> Result<(), HarnessError> {
        self.send_keys_inner(None, keys)
    }

    /// Send keys to pane `pane` of this window.
    pub fn send_keys_to(&self, pane: u32, keys: &[Key]) -> Result<(), HarnessError> {
        self.send_keys_inner(Some(pane), keys)
    }

    fn send_keys_inner(&self, pane: Option<u32>, keys: &[Key]) -> Result<(), HarnessError> {
        for key in keys {
            let name = key.render();
            debug!(session = %self.id, ?pane, key = %name, "send key");
            self.backend.send_keys(&self.id, pane, &name)?;
            std::thread::sleep(self.config.key_delay());
        }
        Ok(())
    }

    /// Type `text` literally, then press Enter.
    pub fn send_line(&self, text: &str) -> Result<(), HarnessError> {
        self.send_keys(&[Key::plain(text), Key::enter()])
    }

    /// Paste `content` as one block, then press Enter.
    pub fn paste(&self, content: &str) -> Result<(), HarnessError> {
        self.backend.paste(&self.id, content)?;
        self.send_keys(&[Key::enter()])
    }

    /// Capture pane 0.
    pub fn capture(&self) -> Result<ScreenSnapshot, HarnessError> {
        self.capture_pane(0)
    }

    /// Capture pane `pane` as plain text.
    pub fn capture_pane(&self, pane: u32) -> Result<ScreenSnapshot, HarnessError> {
        self.capture_with(pane, CaptureMode::Plain)
    }

    /// Capture pane `pane` keeping ANSI color escapes.
    pub fn capture_colored(&self, pane: u32) -> Result<ScreenSnapshot, HarnessError> {
        self.capture_with(pane, CaptureMode::Colored)
    }

    fn capture_with(&self, pane: u32, mode: CaptureMode) -> Result<ScreenSnapshot, HarnessError> {
        self.capture_within(pane, mode, self.config.capture_retry_timeout())
    }

    /// Capture with the retry budget capped at `budget`.
    fn capture_within(
        &self,
        pane: u32,
        mode: CaptureMode,
        budget: Duration,
    ) -> Result<ScreenSnapshot, HarnessError> {
        let retry = PollLoop::new(
            self.config.capture_retry_interval(),
            self.config.capture_retry_timeout().min(budget),
        );
        match retry.wait(
            || self.backend.capture_pane(&self.id, pane, mode),
            Result::is_ok,
        ) {
            Ok(Ok(raw)) => Ok(ScreenSnapshot::from_text(&raw)),
            Ok(Err(e)) => Err(e),
            Err(elapsed) => Err(HarnessError::Capture {
                attempts: elapsed.attempts,
                last_error: elapsed.last.err().map(|e| e.to_string()).unwrap_or_default(),
            }),
        }
    }

    /// Capture and return line `index` from the top of pane 0.
    pub fn line_at(&self, index: usize) -> Result<Option<String>, HarnessError> {
        Ok(self.capture()?.line(index).map(str::to_string))
    }

    /// Wait until `predicate` holds for a capture of pane 0.
    pub fn until<P>(&self, predicate: P) -> Result<ScreenSnapshot, HarnessError>
    where
        P: FnMut(&ScreenSnapshot) -> bool,
    {
        self.until_with(predicate, UntilOptions::default())
    }

    /// Wait until `predicate` holds, with per-call options.
    ///
    /// A capture that fails inside the loop counts as "not ready". Capture
    /// retries never run past the wait's own deadline. On timeout a single
    /// final capture is attempted and reported in the error.
    pub fn until_with<P>(
        &self,
        mut predicate: P,
        options: UntilOptions,
    ) -> Result<ScreenSnapshot, HarnessError>
    where
        P: FnMut(&ScreenSnapshot) -> bool,
    {
        let timeout = options.timeout.unwrap_or_else(|| self.config.wait_timeout());
        let poll = PollLoop::new(self.config.poll_interval(), timeout);
        let start = Instant::now();
        let result = poll.wait(
            || {
                let remaining = timeout.saturating_sub(start.elapsed());
                self.capture_within(options.pane, CaptureMode::Plain, remaining)
            },
            |capture| capture.as_ref().is_ok_and(&mut predicate),
        );

        match result {
            Ok(Ok(snapshot)) => {
                if options.refresh {
                    self.send_keys(&[Key::named(self.config.refresh_key.clone())])?;
                }
                Ok(snapshot)
            }
            Ok(Err(e)) => Err(e),
            Err(elapsed) => {
                let screen = match self
                    .backend
                    .capture_pane(&self.id, options.pane, CaptureMode::Plain)
                {
                    Ok(raw) => ScreenSnapshot::from_text(&raw).render(),
                    Err(e) => format!("<capture failed: {e}>"),
                };
                let expected = options
                    .debug_info
                    .unwrap_or_else(|| "screen predicate".to_string());
                warn!(
                    session = %self.id,
                    elapsed = ?elapsed.elapsed,
                    attempts = elapsed.attempts,
                    debug_info = %expected,
                    "timeout waiting for screen\n{screen}"
                );
                Err(HarnessError::Timeout { expected, screen })
            }
        }
    }

    /// Resynchronise with the shell between steps that share this session.
    ///
    /// Clears the input line, types the sentinel, waits for it to appear at
    /// the end of the last line, and clears again.
    pub fn prepare(&self) -> Result<(), HarnessError> {
        let sentinel = self.config.prepare_sentinel.clone();
        self.send_keys(&[Key::Ctrl('u'), Key::plain(sentinel.as_str())])?;
        self.until_with(
            |snap| snap.last_line().ends_with(sentinel.as_str()),
            UntilOptions::default().debug_info(format!("prepare sentinel {sentinel:?}")),
        )?;
        self.send_keys(&[Key::Ctrl('u')])
    }

    /// Destroy the window. Errors are logged and swallowed; the window may
    /// already be gone.
    pub fn kill(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        match self.backend.destroy_session(&self.id) {
            Ok(()) => info!(session = %self.id, "terminal session destroyed"),
            Err(e) => debug!(session = %self.id, error = %e, "destroy failed, ignoring"),
        }
    }
}

impl<B: TerminalBackend> Drop for TerminalSession<B> {
    fn drop(&mut self) {
        self.kill();
    }
}
