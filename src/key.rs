use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};

/// Keys that move a caret or delete forward. The classifier ignores them and
/// the host is expected to swallow their default action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum NavKey {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,
    Delete,
}

/// A single key as reported by the host, named after `KeyboardEvent.key`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Function(u16),
    Navigation(NavKey),
    /// Any other named key (Shift, Escape, Tab, CapsLock, ...).
    Named(String),
}

impl Key {
    /// Parse a host key identifier. Returns `None` for an empty identifier.
    ///
    /// Only single-codepoint identifiers become [`Key::Char`]. Text that spans
    /// several codepoints (a decomposed accent, an emoji with a modifier) is
    /// kept as [`Key::Named`] and classified as unmapped, since the typed
    /// buffer advances one codepoint per key. Hosts should send composed
    /// (NFC) key values.
    pub fn parse(ident: &str) -> Option<Key> {
        if ident.is_empty() {
            return None;
        }

        let mut chars = ident.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(Key::Char(c));
        }

        let key = match ident {
            "Enter" => Key::Enter,
            "Backspace" => Key::Backspace,
            "Spacebar" => Key::Char(' '),
            "ArrowLeft" => Key::Navigation(NavKey::ArrowLeft),
            "ArrowRight" => Key::Navigation(NavKey::ArrowRight),
            "ArrowUp" => Key::Navigation(NavKey::ArrowUp),
            "ArrowDown" => Key::Navigation(NavKey::ArrowDown),
            "Home" => Key::Navigation(NavKey::Home),
            "End" => Key::Navigation(NavKey::End),
            "PageUp" => Key::Navigation(NavKey::PageUp),
            "PageDown" => Key::Navigation(NavKey::PageDown),
            "Delete" => Key::Navigation(NavKey::Delete),
            other => match function_key_number(other) {
                Some(n) => Key::Function(n),
                None => Key::Named(other.to_string()),
            },
        };
        Some(key)
    }

    /// The character this key would insert, if any. Enter inserts a newline.
    pub fn produced_char(&self) -> Option<char> {
        match self {
            Key::Char(c) => Some(*c),
            Key::Enter => Some('\n'),
            _ => None,
        }
    }

    pub fn is_space(&self) -> bool {
        matches!(self, Key::Char(' '))
    }
}

// "F" followed by one or more ASCII digits
fn function_key_number(ident: &str) -> Option<u16> {
    let digits = ident.strip_prefix('F')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse().unwrap_or(u16::MAX))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        meta: false,
        alt: false,
        shift: false,
    };

    /// Whether the key is part of a shortcut chord the host should handle.
    pub fn is_chord(&self) -> bool {
        self.ctrl || self.meta || self.alt
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(m: KeyModifiers) -> Self {
        Self {
            ctrl: m.contains(KeyModifiers::CONTROL),
            meta: m.intersects(KeyModifiers::SUPER | KeyModifiers::META),
            alt: m.contains(KeyModifiers::ALT),
            shift: m.contains(KeyModifiers::SHIFT),
        }
    }
}

/// A key together with the modifiers held while it was pressed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyInput {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    pub fn char(c: char) -> Self {
        Self::plain(Key::Char(c))
    }
}

impl From<KeyEvent> for KeyInput {
    fn from(event: KeyEvent) -> Self {
        let key = match event.code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::F(n) => Key::Function(u16::from(n)),
            KeyCode::Left => Key::Navigation(NavKey::ArrowLeft),
            KeyCode::Right => Key::Navigation(NavKey::ArrowRight),
            KeyCode::Up => Key::Navigation(NavKey::ArrowUp),
            KeyCode::Down => Key::Navigation(NavKey::ArrowDown),
            KeyCode::Home => Key::Navigation(NavKey::Home),
            KeyCode::End => Key::Navigation(NavKey::End),
            KeyCode::PageUp => Key::Navigation(NavKey::PageUp),
            KeyCode::PageDown => Key::Navigation(NavKey::PageDown),
            KeyCode::Delete => Key::Navigation(NavKey::Delete),
            KeyCode::Esc => Key::Named("Escape".to_string()),
            KeyCode::Tab | KeyCode::BackTab => Key::Named("Tab".to_string()),
            other => Key::Named(format!("{other:?}")),
        };

        Self::new(key, event.modifiers.into())
    }
}
