//! Key events in tmux `send-keys` syntax.
//!
//! A [`Key`] is a backend-agnostic description of a keystroke or chord.
//! Rendering is pure: [`Key::render`] produces the name tmux understands
//! and never validates it. An unknown name surfaces as a backend error when
//! the key is sent.

use std::fmt;

/// A key or chord that can be sent to a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Literal text typed as-is.
    Plain(String),
    /// Ctrl + a character (e.g. `Ctrl('u')` clears the input line).
    Ctrl(char),
    /// Alt/Meta + text.
    Alt(String),
    /// A key name tmux recognises (`Enter`, `Tab`, `BTab`, `BSpace`, ...).
    Named(String),
}

impl Key {
    /// Literal text.
    pub fn plain(text: impl Into<String>) -> Self {
        Key::Plain(text.into())
    }

    /// Alt/Meta chord.
    pub fn alt(text: impl Into<String>) -> Self {
        Key::Alt(text.into())
    }

    /// A backend key name, passed through untouched.
    pub fn named(token: impl Into<String>) -> Self {
        Key::Named(token.into())
    }

    pub fn enter() -> Self {
        Key::named("Enter")
    }

    pub fn tab() -> Self {
        Key::named("Tab")
    }

    /// Shift-Tab.
    pub fn btab() -> Self {
        Key::named("BTab")
    }

    pub fn backspace() -> Self {
        Key::named("BSpace")
    }

    pub fn escape() -> Self {
        Key::named("Escape")
    }

    pub fn left() -> Self {
        Key::named("Left")
    }

    pub fn right() -> Self {
        Key::named("Right")
    }

    pub fn up() -> Self {
        Key::named("Up")
    }

    pub fn down() -> Self {
        Key::named("Down")
    }

    /// The tmux key name for this event.
    pub fn render(&self) -> String {
        match self {
            Key::Plain(text) => text.clone(),
            Key::Ctrl(c) => format!("C-{}", c.to_uppercase()),
            Key::Alt(text) => format!("M-{text}"),
            Key::Named(token) => token.clone(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for Key {
    fn from(text: &str) -> Self {
        Key::Plain(text.to_string())
    }
}

impl From<String> for Key {
    fn from(text: String) -> Self {
        Key::Plain(text)
    }
}
