//! File-based artifact handshake.
//!
//! The tested program writes its output to a path agreed by naming
//! convention, `{base}-{test_id}-{suffix}`. The harness waits for the file
//! to exist, reads it once, deletes it, and advances the per-test sequence
//! number so a later artifact can never be mistaken for an earlier one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use termprobe_types::HarnessConfig;
use tracing::{debug, warn};

use crate::backend::TerminalBackend;
use crate::error::HarnessError;
use crate::poll::PollLoop;
use crate::session::TerminalSession;

/// Consume-once exchange of artifact files, keyed by test identifier.
#[derive(Debug)]
pub struct ArtifactExchange {
    base: PathBuf,
    poll: PollLoop,
    sequence: HashMap<String, u32>,
}

impl ArtifactExchange {
    /// Build an exchange from the artifact section of `config`.
    pub fn new(config: &HarnessConfig) -> Self {
        Self::with_base(
            config.artifact.base_path.clone(),
            PollLoop::new(config.artifact_poll_interval(), config.artifact_timeout()),
        )
    }

    pub fn with_base(base: PathBuf, poll: PollLoop) -> Self {
        Self {
            base,
            poll,
            sequence: HashMap::new(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The deterministic path for `test_id` at sequence number `suffix`.
    pub fn path_for(&self, test_id: &str, suffix: u32) -> PathBuf {
        let mut name = self.base.as_os_str().to_os_string();
        name.push(format!("-{test_id}-{suffix}"));
        PathBuf::from(name)
    }

    /// The sequence number the next `readonce` for `test_id` will use.
    pub fn sequence(&self, test_id: &str) -> u32 {
        self.sequence.get(test_id).copied().unwrap_or(0)
    }

    /// The path the next artifact for `test_id` is expected at.
    pub fn current_path(&self, test_id: &str) -> PathBuf {
        self.path_for(test_id, self.sequence(test_id))
    }

    fn resolve(&self, test_id: &str, suffix: Option<u32>) -> PathBuf {
        self.path_for(test_id, suffix.unwrap_or_else(|| self.sequence(test_id)))
    }

    /// Wrap `command` so its stdout lands at the artifact path atomically:
    /// written to `{path}.tmp`, then renamed into place.
    pub fn redirect(&self, test_id: &str, suffix: Option<u32>, command: &str) -> String {
        let path = self.resolve(test_id, suffix).display().to_string();
        let tmp = shell_quote(&format!("{path}.tmp"));
        let path = shell_quote(&path);
        format!("{command} > {tmp}; mv {tmp} {path}")
    }

    /// Remove a stale artifact for `test_id`; `None` targets the current
    /// sequence number.
    pub fn clear_stale(&self, test_id: &str, suffix: Option<u32>) -> Result<(), HarnessError> {
        let path = self.resolve(test_id, suffix);
        debug!(path = %path.display(), "clearing stale artifact");
        remove_if_exists(&path)
    }

    /// Replace whatever is at `path` with `content`.
    ///
    /// The content is written to a sibling temp file and renamed into place,
    /// so a concurrent reader never sees a partial file.
    pub fn write(path: &Path, content: &str) -> Result<(), HarnessError> {
        remove_if_exists(path)?;
        let mut tmp = path.as_os_str().to_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Wait for the artifact, read it, and delete it.
    ///
    /// The sequence number for `test_id` advances whether or not the file
    /// appeared. This does not resynchronise any session; see
    /// [`readonce`](Self::readonce).
    pub fn take(&mut self, test_id: &str, suffix: Option<u32>) -> Result<String, HarnessError> {
        let suffix = suffix.unwrap_or_else(|| self.sequence(test_id));
        let path = self.path_for(test_id, suffix);

        let found = self.poll.wait(|| path.exists(), |exists| *exists);
        let result = match found {
            Ok(_) => std::fs::read_to_string(&path).map_err(HarnessError::from),
            Err(elapsed) => {
                warn!(path = %path.display(), waited = ?elapsed.elapsed, "artifact never appeared");
                Err(HarnessError::ArtifactTimeout {
                    path: path.clone(),
                    waited: elapsed.elapsed,
                })
            }
        };

        let cleanup = remove_if_exists(&path);
        *self.sequence.entry(test_id.to_string()).or_insert(0) += 1;
        debug!(test_id, suffix, ok = result.is_ok(), "artifact consumed");

        let content = result?;
        cleanup?;
        Ok(content)
    }

    /// Read an artifact once, then resynchronise `session` for the next step.
    pub fn readonce<B: TerminalBackend>(
        &mut self,
        session: &TerminalSession<B>,
        test_id: &str,
        suffix: Option<u32>,
    ) -> Result<String, HarnessError> {
        let result = self.take(test_id, suffix);
        let prepared = session.prepare();
        let content = result?;
        prepared?;
        Ok(content)
    }
}

/// Single-quote `text` for a POSIX shell.
fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

fn remove_if_exists(path: &Path) -> Result<(), HarnessError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
