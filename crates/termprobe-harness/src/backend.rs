//! Terminal-hosting backend abstraction.
//!
//! [`TerminalSession`](crate::session::TerminalSession) drives any
//! [`TerminalBackend`]. The production implementation is
//! [`TmuxBackend`](crate::tmux::TmuxBackend); tests use the scripted
//! in-memory backend from [`mocks`](crate::mocks).

use std::fmt;

use crate::error::HarnessError;

/// Opaque backend handle for one window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How pane text is exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Plain text, wrapped lines joined.
    #[default]
    Plain,
    /// Keep ANSI color escapes.
    Colored,
}

/// The minimal process-hosting facility the harness needs.
///
/// Every call is synchronous. Implementations report failures as
/// [`HarnessError`]; retrying is the caller's decision.
pub trait TerminalBackend {
    /// Start a new window running `shell_command` and return its handle.
    fn create_session(&self, shell_command: &str) -> Result<SessionId, HarnessError>;

    /// Send one key name to a pane. `pane` of `None` targets the active pane.
    fn send_keys(&self, session: &SessionId, pane: Option<u32>, key: &str)
        -> Result<(), HarnessError>;

    /// Export the rendered content of pane `pane` as raw text.
    fn capture_pane(
        &self,
        session: &SessionId,
        pane: u32,
        mode: CaptureMode,
    ) -> Result<String, HarnessError>;

    /// Paste `text` into the session as a single bracketed block.
    fn paste(&self, session: &SessionId, text: &str) -> Result<(), HarnessError>;

    /// Tear the window down.
    fn destroy_session(&self, session: &SessionId) -> Result<(), HarnessError>;
}

impl<B: TerminalBackend + ?Sized> TerminalBackend for &B {
    fn create_session(&self, shell_command: &str) -> Result<SessionId, HarnessError> {
        (**self).create_session(shell_command)
    }

    fn send_keys(
        &self,
        session: &SessionId,
        pane: Option<u32>,
        key: &str,
    ) -> Result<(), HarnessError> {
        (**self).send_keys(session, pane, key)
    }

    fn capture_pane(
        &self,
        session: &SessionId,
        pane: u32,
        mode: CaptureMode,
    ) -> Result<String, HarnessError> {
        (**self).capture_pane(session, pane, mode)
    }

    fn paste(&self, session: &SessionId, text: &str) -> Result<(), HarnessError> {
        (**self).paste(session, text)
    }

    fn destroy_session(&self, session: &SessionId) -> Result<(), HarnessError> {
        (**self).destroy_session(session)
    }
}
