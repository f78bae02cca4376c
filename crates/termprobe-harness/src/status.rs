//! Status-line parsing.
//!
//! The tested program renders a status line of the form
//!
//! ```text
//! plain:    `| 10/219 [2]               8/0.`
//! inline:   `> query < 10/219 [2]       8/0.`
//! preview:  `  10/219 [2]               8/0. │ preview...`
//! ```
//!
//! All shapes share one core: `matched/total`, optional `[selected]`,
//! `cursor/hscroll`, and a trailing `.` once the matcher has settled.
//! Each shape is a named matcher; they are tried in [`StatusShape::ALL`]
//! order and the first match wins. A snapshot's status line is the first
//! line (top to bottom) any shape accepts.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Shared core of every status-line shape.
const CORE: &str = r"(?P<matched>[0-9]+)/(?P<total>[0-9]+)(?:/[A-Z]*)?(?: \[(?P<selected>[0-9]+)\])? *(?P<cursor>[0-9]+)/(?P<hscroll>-?[0-9]+)(?P<settled>\.)?";

/// Which textual shape a status line was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusShape {
    /// Counts followed by the preview pane's column separator, optionally
    /// preceded by an inline query.
    Preview,
    /// Live query, then an inline separator (`<`, or `-` while running),
    /// then the counts.
    Inline,
    /// Counts on a line of their own.
    Plain,
}

impl StatusShape {
    /// Priority order used when matching a line.
    pub const ALL: [StatusShape; 3] = [
        StatusShape::Preview,
        StatusShape::Inline,
        StatusShape::Plain,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StatusShape::Preview => "preview",
            StatusShape::Inline => "inline",
            StatusShape::Plain => "plain",
        }
    }

    fn pattern(&self) -> String {
        match self {
            StatusShape::Preview => {
                format!(r"^(?:(?P<query>.*?) [<-] |[^<-]*. ){CORE} *│.*$")
            }
            StatusShape::Inline => format!(r"^(?P<query>.*?) [<-] {CORE} *$"),
            StatusShape::Plain => format!(r"^[^<-]*. {CORE} *$"),
        }
    }
}

struct ShapeMatcher {
    shape: StatusShape,
    regex: Regex,
}

impl ShapeMatcher {
    fn try_match(&self, line: &str) -> Option<StatusLine> {
        let caps = self.regex.captures(line)?;
        Some(StatusLine {
            match_count: number(&caps, "matched")?,
            item_count: number(&caps, "total")?,
            select_count: number(&caps, "selected").unwrap_or(0),
            item_cursor: number(&caps, "cursor")?,
            hscroll: caps.name("hscroll")?.as_str().parse().ok()?,
            matcher_stopped: caps.name("settled").is_some(),
            shape: Some(self.shape),
            query: caps.name("query").map(|m| m.as_str().to_string()),
        })
    }
}

fn number(caps: &Captures<'_>, group: &str) -> Option<u64> {
    caps.name(group)?.as_str().parse().ok()
}

fn matchers() -> &'static [ShapeMatcher] {
    static MATCHERS: OnceLock<Vec<ShapeMatcher>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        StatusShape::ALL
            .iter()
            .filter_map(|shape| {
                Regex::new(&shape.pattern()).ok().map(|regex| ShapeMatcher {
                    shape: *shape,
                    regex,
                })
            })
            .collect()
    })
}

/// Counts and state parsed from the status line.
///
/// The default value (all zero, not stopped, no shape) is what a snapshot
/// reports before the status line has been rendered, so readiness
/// predicates read it as "not ready" rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    pub match_count: u64,
    pub item_count: u64,
    pub select_count: u64,
    pub item_cursor: u64,
    /// Horizontal scroll offset; negative values are valid.
    pub hscroll: i64,
    /// The trailing `.` is present: the matcher finished its pass.
    pub matcher_stopped: bool,
    /// The shape that matched, `None` when no line matched.
    pub shape: Option<StatusShape>,
    /// Text preceding the inline separator, for the inline shape.
    pub query: Option<String>,
}

impl StatusLine {
    /// Parse a single line, trying each shape in priority order.
    pub fn parse_line(line: &str) -> Option<StatusLine> {
        matchers().iter().find_map(|m| m.try_match(line))
    }

    /// Parse the first matching line, or return the not-ready default.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> StatusLine {
        lines
            .iter()
            .find_map(|line| Self::parse_line(line.as_ref()))
            .unwrap_or_default()
    }

    /// Whether any line matched.
    pub fn is_present(&self) -> bool {
        self.shape.is_some()
    }

    /// `item_count == n` and the matcher has settled.
    pub fn ready_with_lines(&self, n: u64) -> bool {
        self.item_count == n && self.matcher_stopped
    }

    /// `match_count == n` and the matcher has settled.
    pub fn ready_with_matches(&self, n: u64) -> bool {
        self.match_count == n && self.matcher_stopped
    }
}
