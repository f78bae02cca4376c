//! Per-test fixture tying a session to an artifact exchange.

use std::path::PathBuf;

use termprobe_types::HarnessConfig;
use tracing::info;

use crate::artifact::ArtifactExchange;
use crate::backend::TerminalBackend;
use crate::error::HarnessError;
use crate::key::Key;
use crate::session::{TerminalSession, UntilOptions};
use crate::snapshot::ScreenSnapshot;

/// One test's view of the harness.
///
/// The test identifier is explicit and namespaces every artifact path, so
/// concurrently running cases never read each other's output.
pub struct TestCase<B: TerminalBackend> {
    test_id: String,
    session: TerminalSession<B>,
    exchange: ArtifactExchange,
}

impl<B: TerminalBackend> TestCase<B> {
    /// Open a session on `backend` and remove any artifact left over from
    /// an earlier run of the same test.
    pub fn new(
        backend: B,
        config: HarnessConfig,
        test_id: impl Into<String>,
    ) -> Result<Self, HarnessError> {
        let test_id = test_id.into();
        let exchange = ArtifactExchange::new(&config);
        exchange.clear_stale(&test_id, None)?;
        let session = TerminalSession::create(backend, config)?;
        info!(test_id = %test_id, session = %session.id(), "test case started");
        Ok(Self {
            test_id,
            session,
            exchange,
        })
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    pub fn session(&self) -> &TerminalSession<B> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut TerminalSession<B> {
        &mut self.session
    }

    pub fn exchange(&self) -> &ArtifactExchange {
        &self.exchange
    }

    /// Artifact path for this test; `None` means the next unread one.
    pub fn tempname(&self, suffix: Option<u32>) -> PathBuf {
        match suffix {
            Some(n) => self.exchange.path_for(&self.test_id, n),
            None => self.exchange.current_path(&self.test_id),
        }
    }

    /// `command` with stdout redirected atomically to this test's artifact.
    ///
    /// Any file already at the target path is removed first, so the next
    /// read can only observe output written after this call.
    pub fn redirect(&self, command: &str, suffix: Option<u32>) -> Result<String, HarnessError> {
        self.exchange.clear_stale(&self.test_id, suffix)?;
        Ok(self.exchange.redirect(&self.test_id, suffix, command))
    }

    /// Read this test's artifact once and resynchronise the session.
    pub fn readonce(&mut self, suffix: Option<u32>) -> Result<String, HarnessError> {
        self.exchange
            .readonce(&self.session, &self.test_id, suffix)
    }

    /// Run `{stdin} | {command}` with output redirected to the artifact,
    /// wait for `predicate`, then press Enter to accept.
    pub fn command_until<P>(
        &self,
        stdin: &str,
        command: &str,
        predicate: P,
    ) -> Result<ScreenSnapshot, HarnessError>
    where
        P: FnMut(&ScreenSnapshot) -> bool,
    {
        let line = format!("{stdin} | {}", self.redirect(command, None)?);
        self.session.send_line(&line)?;
        let snapshot = self.session.until_with(
            predicate,
            UntilOptions::default().debug_info(format!("command: {command}")),
        )?;
        self.session.send_keys(&[Key::enter()])?;
        Ok(snapshot)
    }

    /// Line `index` of a fresh capture, counted from the top.
    pub fn line_at(&self, index: usize) -> Result<Option<String>, HarnessError> {
        self.session.line_at(index)
    }
}
