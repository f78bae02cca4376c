//! Screen snapshot capture and inspection.
//!
//! A [`ScreenSnapshot`] is one capture of a pane: its visible rows top line
//! first, trailing blank lines trimmed, plus the [`StatusLine`] parsed from
//! them. Snapshots are never mutated; every capture produces a new one.

use std::fmt;
use std::time::Instant;

use regex::Regex;

use crate::ansi::strip_ansi;
use crate::error::HarnessError;
use crate::status::StatusLine;

/// A frozen capture of a pane.
#[derive(Debug, Clone)]
pub struct ScreenSnapshot {
    lines: Vec<String>,
    status: StatusLine,
    timestamp: Instant,
}

impl ScreenSnapshot {
    /// Build a snapshot from exported pane text.
    ///
    /// Trailing whitespace of the whole export is trimmed before splitting,
    /// so blank rows below the last rendered line disappear. ANSI escapes
    /// (present in colored captures) are kept in the lines but ignored when
    /// parsing the status line.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim_end();
        let lines: Vec<String> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('\n').map(|l| l.trim_end_matches('\r').to_string()).collect()
        };
        Self::from_lines(lines)
    }

    /// Build a snapshot from already-split rows.
    pub fn from_lines(lines: Vec<String>) -> Self {
        let status = if lines.iter().any(|l| crate::ansi::has_ansi(l)) {
            let plain: Vec<String> = lines.iter().map(|l| strip_ansi(l)).collect();
            StatusLine::from_lines(&plain)
        } else {
            StatusLine::from_lines(&lines)
        };
        Self {
            lines,
            status,
            timestamp: Instant::now(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line `index` counted from the top.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Line `index` counted from the bottom (`0` is the last line).
    pub fn line_from_bottom(&self, index: usize) -> Option<&str> {
        let len = self.lines.len();
        if index >= len {
            return None;
        }
        self.line(len - 1 - index)
    }

    /// The last rendered line, or `""` for an empty pane.
    pub fn last_line(&self) -> &str {
        self.line_from_bottom(0).unwrap_or("")
    }

    /// The parsed status line.
    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    /// When this snapshot was captured.
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// The snapshot with ANSI escapes removed from every line.
    pub fn plain(&self) -> ScreenSnapshot {
        Self {
            lines: self.lines.iter().map(|l| strip_ansi(l)).collect(),
            status: self.status.clone(),
            timestamp: self.timestamp,
        }
    }

    pub fn match_count(&self) -> u64 {
        self.status.match_count
    }

    pub fn item_count(&self) -> u64 {
        self.status.item_count
    }

    pub fn select_count(&self) -> u64 {
        self.status.select_count
    }

    pub fn item_cursor(&self) -> u64 {
        self.status.item_cursor
    }

    pub fn hscroll(&self) -> i64 {
        self.status.hscroll
    }

    pub fn matcher_stopped(&self) -> bool {
        self.status.matcher_stopped
    }

    /// `item_count == n` and the matcher has settled.
    pub fn ready_with_lines(&self, n: u64) -> bool {
        self.status.ready_with_lines(n)
    }

    /// `match_count == n` and the matcher has settled.
    pub fn ready_with_matches(&self, n: u64) -> bool {
        self.status.ready_with_matches(n)
    }

    /// Whether any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }

    /// Whether any line matches `re`.
    pub fn matches(&self, re: &Regex) -> bool {
        self.lines.iter().any(|l| re.is_match(l))
    }

    /// Compile `pattern` and check it against every line.
    pub fn matches_pattern(&self, pattern: &str) -> Result<bool, HarnessError> {
        let re = Regex::new(pattern)?;
        Ok(self.matches(&re))
    }

    /// The lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Bordered dump for timeout diagnostics, with the parsed status below.
    pub fn render(&self) -> String {
        let width = self
            .lines
            .iter()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0);
        let border = format!("+{}+", "-".repeat(width));

        let mut out = Vec::with_capacity(self.lines.len() + 3);
        out.push(border.clone());
        for line in &self.lines {
            let pad = width - line.chars().count();
            out.push(format!("|{line}{}|", " ".repeat(pad)));
        }
        out.push(border);
        let s = &self.status;
        out.push(match s.shape {
            Some(shape) => format!(
                "status[{}]: matched={} items={} selected={} cursor={} hscroll={} stopped={}",
                shape.name(),
                s.match_count,
                s.item_count,
                s.select_count,
                s.item_cursor,
                s.hscroll,
                s.matcher_stopped
            ),
            None => "status: <none>".to_string(),
        });
        out.join("\n")
    }
}

impl fmt::Display for ScreenSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_blank_rows_trimmed() {
        let snap = ScreenSnapshot::from_text("a1\na2\n  2/2 0/0.\n> \n\n\n");
        assert_eq!(snap.len(), 4);
        assert_eq!(snap.last_line(), ">");
        assert_eq!(snap.line(0), Some("a1"));
        assert_eq!(snap.line_from_bottom(1), Some("  2/2 0/0."));
    }

    #[test]
    fn empty_capture() {
        let snap = ScreenSnapshot::from_text("\n\n");
        assert!(snap.is_empty());
        assert_eq!(snap.last_line(), "");
        assert!(!snap.status().is_present());
    }

    #[test]
    fn status_parsed_on_capture() {
        let snap = ScreenSnapshot::from_text("  a3\n  a2\n> a1\n  3/3 0/0.\n>");
        assert!(snap.ready_with_lines(3));
        assert!(snap.ready_with_matches(3));
        assert_eq!(snap.item_cursor(), 0);
    }

    #[test]
    fn readiness_toggles_across_snapshots() {
        let running = ScreenSnapshot::from_text("  10/10 0/0");
        let settled = ScreenSnapshot::from_text("  10/10 0/0.");
        let again = ScreenSnapshot::from_text("  11/12 0/0");

        assert!(!running.ready_with_lines(10));
        assert!(settled.ready_with_lines(10));
        assert!(!again.ready_with_lines(12));

        // Earlier captures are unaffected by later ones.
        assert!(!running.matcher_stopped());
        assert!(settled.matcher_stopped());
    }

    #[test]
    fn colored_capture_still_parses_status() {
        let snap = ScreenSnapshot::from_text("\x1b[1m  4/5\x1b[0m [1] 0/0.\n\x1b[31m>\x1b[0m a");
        assert_eq!(snap.item_count(), 5);
        assert_eq!(snap.select_count(), 1);
        assert!(snap.lines()[0].contains('\x1b'));
        assert_eq!(snap.plain().line(0), Some("  4/5 [1] 0/0."));
    }

    #[test]
    fn substring_and_pattern_search() {
        let snap = ScreenSnapshot::from_text("> foo\n  bar\n  2/2 0/0.");
        assert!(snap.contains("bar"));
        assert!(!snap.contains("baz"));
        assert!(snap.matches_pattern(r"^> f.o$").unwrap());
        assert!(snap.matches_pattern("(").is_err());
    }

    #[test]
    fn render_includes_border_and_status() {
        let snap = ScreenSnapshot::from_text("ab\n  1/1 0/0.");
        let rendered = snap.render();
        assert!(rendered.contains("+----------+"));
        assert!(rendered.contains("|ab        |"));
        assert!(rendered.contains("status[plain]: matched=1 items=1"));
    }
}
