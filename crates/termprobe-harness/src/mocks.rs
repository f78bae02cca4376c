//! Scripted in-memory terminal backend.
//!
//! [`MockTerminal`] stands in for tmux when exercising sessions, waits and
//! the artifact handshake without a real terminal server. It models a shell
//! with an empty prompt: typed text accumulates on the last line, `C-U`
//! clears it, `Enter` commits it to the scroll-back and runs any registered
//! command handler. Failures can be injected per operation.
//!
//! Clones share state via `Arc<Mutex<_>>`, so a test can keep a handle for
//! inspection after moving one into a session.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::{CaptureMode, SessionId, TerminalBackend};
use crate::error::HarnessError;

/// Produces output lines for a committed input line.
type CommandHandler = Box<dyn FnMut(&str) -> Vec<String> + Send>;

/// Key names interpreted as keystrokes rather than literal text.
const NAMED_KEYS: &[&str] = &[
    "Enter", "Tab", "BTab", "BSpace", "Escape", "Left", "Right", "Up", "Down", "Home", "End",
    "PageUp", "PageDown", "Space",
];

#[derive(Default)]
struct MockTerminalInner {
    /// Committed lines, oldest first.
    scrollback: Vec<String>,
    /// The line being typed.
    input: String,
    /// Lines rendered below the input line, e.g. a status line.
    footer: Vec<String>,
    /// Every key name received, in order.
    keys: Vec<String>,
    /// Every pasted block, in order.
    pastes: Vec<String>,
    /// Commands committed with Enter.
    commands: Vec<String>,
    handlers: Vec<CommandHandler>,
    next_id: u32,
    live: Vec<SessionId>,
    destroyed: Vec<SessionId>,
    capture_count: u32,
    /// Number of upcoming captures that fail.
    failing_captures: u32,
    /// Queued raw captures returned ahead of the rendered screen.
    frames: VecDeque<String>,
    fail_create: bool,
    fail_destroy: bool,
}

impl fmt::Debug for MockTerminalInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTerminalInner")
            .field("scrollback", &self.scrollback)
            .field("input", &self.input)
            .field("footer", &self.footer)
            .field("keys", &self.keys)
            .field("live", &self.live)
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

impl MockTerminalInner {
    fn render(&self) -> String {
        let mut lines: Vec<&str> = self.scrollback.iter().map(String::as_str).collect();
        lines.push(&self.input);
        lines.extend(self.footer.iter().map(String::as_str));
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    fn apply_key(&mut self, key: &str) {
        match key {
            "C-U" => self.input.clear(),
            "BSpace" => {
                self.input.pop();
            }
            "Space" => self.input.push(' '),
            "Enter" => {
                let line = std::mem::take(&mut self.input);
                self.scrollback.push(line.clone());
                let mut output = Vec::new();
                for handler in &mut self.handlers {
                    output.extend(handler(&line));
                }
                self.scrollback.extend(output);
                self.commands.push(line);
            }
            k if NAMED_KEYS.contains(&k) || k.starts_with("C-") || k.starts_with("M-") => {}
            text => self.input.push_str(text),
        }
    }
}

/// A thread-safe fake terminal implementing [`TerminalBackend`].
///
/// # Example
///
/// ```
/// use termprobe_harness::mocks::MockTerminal;
/// use termprobe_harness::{TerminalSession, Key};
/// use termprobe_types::HarnessConfig;
///
/// let term = MockTerminal::new();
/// let session = TerminalSession::create(term.clone(), HarnessConfig::default()).unwrap();
/// session.send_keys(&[Key::plain("ls"), Key::enter()]).unwrap();
/// assert_eq!(term.commands(), vec!["ls".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTerminal {
    inner: Arc<Mutex<MockTerminalInner>>,
}

impl MockTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockTerminalInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append lines to the scroll-back, as if a program printed them.
    pub fn print_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().scrollback.extend(lines.into_iter().map(Into::into));
    }

    /// Replace the lines rendered below the input line.
    pub fn set_footer<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().footer = lines.into_iter().map(Into::into).collect();
    }

    /// Clear scroll-back, input and footer.
    pub fn clear_screen(&self) {
        let mut inner = self.lock();
        inner.scrollback.clear();
        inner.input.clear();
        inner.footer.clear();
    }

    /// Register a handler run on every committed input line; its return
    /// value is printed after the line.
    pub fn on_command<F>(&self, handler: F)
    where
        F: FnMut(&str) -> Vec<String> + Send + 'static,
    {
        self.lock().handlers.push(Box::new(handler));
    }

    /// Queue a raw capture returned verbatim before the rendered screen.
    pub fn push_frame(&self, raw: impl Into<String>) {
        self.lock().frames.push_back(raw.into());
    }

    /// Make the next `n` captures fail.
    pub fn fail_next_captures(&self, n: u32) {
        self.lock().failing_captures = n;
    }

    pub fn fail_create(&self, fail: bool) {
        self.lock().fail_create = fail;
    }

    pub fn fail_destroy(&self, fail: bool) {
        self.lock().fail_destroy = fail;
    }

    /// The current input line.
    pub fn input(&self) -> String {
        self.lock().input.clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys.clone()
    }

    pub fn pastes(&self) -> Vec<String> {
        self.lock().pastes.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    pub fn capture_count(&self) -> u32 {
        self.lock().capture_count
    }

    pub fn live_sessions(&self) -> Vec<SessionId> {
        self.lock().live.clone()
    }

    pub fn destroyed(&self) -> Vec<SessionId> {
        self.lock().destroyed.clone()
    }

    fn check_live(inner: &MockTerminalInner, session: &SessionId) -> Result<(), HarnessError> {
        if inner.live.contains(session) {
            Ok(())
        } else {
            Err(HarnessError::Backend {
                command: format!("mock {session}"),
                stderr: format!("can't find window: {session}"),
            })
        }
    }
}

impl TerminalBackend for MockTerminal {
    fn create_session(&self, shell_command: &str) -> Result<SessionId, HarnessError> {
        let mut inner = self.lock();
        if inner.fail_create {
            return Err(HarnessError::Setup(format!(
                "mock refused to start {shell_command:?}"
            )));
        }
        let id = SessionId(format!("@{}", inner.next_id));
        inner.next_id += 1;
        inner.live.push(id.clone());
        Ok(id)
    }

    fn send_keys(
        &self,
        session: &SessionId,
        _pane: Option<u32>,
        key: &str,
    ) -> Result<(), HarnessError> {
        let mut inner = self.lock();
        Self::check_live(&inner, session)?;
        inner.keys.push(key.to_string());
        inner.apply_key(key);
        Ok(())
    }

    fn capture_pane(
        &self,
        session: &SessionId,
        pane: u32,
        _mode: CaptureMode,
    ) -> Result<String, HarnessError> {
        let mut inner = self.lock();
        Self::check_live(&inner, session)?;
        inner.capture_count += 1;
        if inner.failing_captures > 0 {
            inner.failing_captures -= 1;
            return Err(HarnessError::Backend {
                command: format!("mock capture-pane -t {session}.{pane}"),
                stderr: "injected capture failure".to_string(),
            });
        }
        match inner.frames.pop_front() {
            Some(frame) => Ok(frame),
            None => Ok(inner.render()),
        }
    }

    fn paste(&self, session: &SessionId, text: &str) -> Result<(), HarnessError> {
        let mut inner = self.lock();
        Self::check_live(&inner, session)?;
        inner.pastes.push(text.to_string());
        inner.input.push_str(text);
        Ok(())
    }

    fn destroy_session(&self, session: &SessionId) -> Result<(), HarnessError> {
        let mut inner = self.lock();
        if inner.fail_destroy {
            return Err(HarnessError::Backend {
                command: format!("mock kill-window -t {session}"),
                stderr: "injected destroy failure".to_string(),
            });
        }
        Self::check_live(&inner, session)?;
        inner.live.retain(|s| s != session);
        inner.destroyed.push(session.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(term: &MockTerminal) -> SessionId {
        term.create_session("bash").expect("should open mock session")
    }

    #[test]
    fn typing_accumulates_on_last_line() {
        let term = MockTerminal::new();
        let id = open(&term);
        for key in ["echo", " ", "hi"] {
            term.send_keys(&id, None, key).unwrap();
        }
        let raw = term.capture_pane(&id, 0, CaptureMode::Plain).unwrap();
        assert_eq!(raw, "echo hi\n");
        assert_eq!(term.input(), "echo hi");
    }

    #[test]
    fn ctrl_u_and_backspace_edit_input() {
        let term = MockTerminal::new();
        let id = open(&term);
        term.send_keys(&id, None, "abc").unwrap();
        term.send_keys(&id, None, "BSpace").unwrap();
        assert_eq!(term.input(), "ab");
        term.send_keys(&id, None, "C-U").unwrap();
        assert_eq!(term.input(), "");
    }

    #[test]
    fn enter_runs_handlers() {
        let term = MockTerminal::new();
        term.on_command(|line| vec![format!("ran: {line}")]);
        let id = open(&term);
        term.send_keys(&id, None, "true").unwrap();
        term.send_keys(&id, None, "Enter").unwrap();
        let raw = term.capture_pane(&id, 0, CaptureMode::Plain).unwrap();
        assert_eq!(raw, "true\nran: true\n\n");
        assert_eq!(term.commands(), vec!["true"]);
    }

    #[test]
    fn injected_capture_failures_are_consumed() {
        let term = MockTerminal::new();
        let id = open(&term);
        term.fail_next_captures(2);
        assert!(term.capture_pane(&id, 0, CaptureMode::Plain).is_err());
        assert!(term.capture_pane(&id, 0, CaptureMode::Plain).is_err());
        assert!(term.capture_pane(&id, 0, CaptureMode::Plain).is_ok());
        assert_eq!(term.capture_count(), 3);
    }

    #[test]
    fn frames_are_returned_first() {
        let term = MockTerminal::new();
        let id = open(&term);
        term.push_frame("frame one");
        assert_eq!(
            term.capture_pane(&id, 0, CaptureMode::Plain).unwrap(),
            "frame one"
        );
        assert_eq!(term.capture_pane(&id, 0, CaptureMode::Plain).unwrap(), "\n");
    }

    #[test]
    fn destroyed_sessions_reject_keys() {
        let term = MockTerminal::new();
        let id = open(&term);
        term.destroy_session(&id).unwrap();
        assert!(term.send_keys(&id, None, "x").is_err());
        assert_eq!(term.destroyed(), vec![id]);
        assert!(term.live_sessions().is_empty());
    }
}
