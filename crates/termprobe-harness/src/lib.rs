//! tmux-driven interaction harness for end-to-end tests of terminal programs.
//!
//! The harness starts the program under test inside an isolated tmux window,
//! types into it, captures the rendered screen, and blocks until a condition
//! on that screen holds. Output the program writes to disk is collected
//! through a consume-once file handshake.
//!
//! # Overview
//!
//! - [`TerminalSession`]: one window; keys in, [`ScreenSnapshot`]s out
//! - [`Key`]: key events in tmux `send-keys` syntax
//! - [`StatusLine`]: counts parsed from the program's status line
//! - [`PollLoop`]: the bounded sleep-then-check wait used everywhere
//! - [`ArtifactExchange`]: read-once artifact files keyed by test
//! - [`TestCase`]: fixture combining a session with its artifacts
//! - [`TerminalBackend`]: the seam between sessions and tmux
//!
//! # Example
//!
//! ```no_run
//! use termprobe_harness::{Key, TerminalSession, TmuxBackend};
//! use termprobe_types::HarnessConfig;
//!
//! let config = HarnessConfig::default();
//! let backend = TmuxBackend::new(&config).expect("should create tmux backend");
//! let session = TerminalSession::create(backend, config).unwrap();
//! session.send_keys(&[Key::plain("printf 'a\\nb' | sk"), Key::enter()]).unwrap();
//! let snap = session.until(|s| s.ready_with_lines(2)).unwrap();
//! assert_eq!(snap.match_count(), 2);
//! ```

pub mod ansi;
pub mod artifact;
pub mod backend;
pub mod case;
pub mod error;
pub mod key;
pub mod mocks;
pub mod poll;
pub mod session;
pub mod snapshot;
pub mod status;
pub mod tmux;

pub use artifact::ArtifactExchange;
pub use backend::{CaptureMode, SessionId, TerminalBackend};
pub use case::TestCase;
pub use error::HarnessError;
pub use key::Key;
pub use poll::{Elapsed, PollLoop};
pub use session::{TerminalSession, UntilOptions};
pub use snapshot::ScreenSnapshot;
pub use status::{StatusLine, StatusShape};
pub use tmux::{tmux_available, TmuxBackend};
