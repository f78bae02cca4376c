//! ANSI escape stripping for colored pane captures.
//!
//! `capture-pane -e` keeps SGR sequences so color assertions can be made,
//! but status-line parsing and substring checks need the plain text.

/// Remove ANSI escape sequences from `input`.
///
/// Handles CSI (`ESC [ ... final`), OSC (`ESC ] ... BEL` or `ESC ] ... ESC \`)
/// and two-character escapes (`ESC 7`, `ESC M`, ...).
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('[') => {
                // Parameter and intermediate bytes, then one final byte.
                while let Some(&p) = chars.peek() {
                    if ('\x20'..='\x3f').contains(&p) {
                        chars.next();
                    } else {
                        break;
                    }
                }
                if chars.peek().is_some_and(|f| ('\x40'..='\x7e').contains(f)) {
                    chars.next();
                }
            }
            Some(']') => {
                while let Some(p) = chars.next() {
                    if p == '\x07' {
                        break;
                    }
                    if p == '\x1b' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            Some(_) | None => {}
        }
    }

    out
}

/// Whether `input` contains any escape sequence.
pub fn has_ansi(input: &str) -> bool {
    input.contains('\x1b')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_unchanged() {
        assert_eq!(strip_ansi("> a1"), "> a1");
    }

    #[test]
    fn strips_sgr_colors() {
        let colored = "\x1b[38;5;151m> \x1b[0ma\x1b[1m1\x1b[0m";
        assert_eq!(strip_ansi(colored), "> a1");
        assert!(has_ansi(colored));
    }

    #[test]
    fn strips_osc_title() {
        assert_eq!(strip_ansi("\x1b]0;title\x07text"), "text");
        assert_eq!(strip_ansi("\x1b]2;t\x1b\\text"), "text");
    }

    #[test]
    fn strips_two_char_escape() {
        assert_eq!(strip_ansi("a\x1b7b\x1b8c"), "abc");
    }

    #[test]
    fn keeps_multibyte_text() {
        assert_eq!(strip_ansi("\x1b[31m│ préview\x1b[0m"), "│ préview");
    }

    #[test]
    fn trailing_escape_is_dropped() {
        assert_eq!(strip_ansi("abc\x1b"), "abc");
    }
}
