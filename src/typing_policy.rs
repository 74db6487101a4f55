use crate::key::{Key, Modifiers};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum Outcome {
    Correct,
    Incorrect,
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum IgnoreReason {
    /// Function keys and Ctrl/Meta/Alt chords, left to the host.
    System,
    /// Caret movement and forward delete.
    Navigation,
    /// The buffer already covers the whole target.
    Extra,
    /// A named key that inserts nothing (Shift, Escape, ...).
    Unmapped,
}

impl IgnoreReason {
    /// Whether the host must suppress the key's default behavior.
    pub fn suppresses_default(&self) -> bool {
        matches!(self, IgnoreReason::Navigation)
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum BlockReason {
    /// The next expected char is a space and a different key was pressed.
    StrictSpaceBoundary,
    /// A word boundary was reached with uncorrected errors behind it.
    GateTyposPresent,
}

/// What to do with a single key event.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputDecision {
    Ignore(IgnoreReason),
    Accept { ch: char, classified_as: Outcome },
    Backspace,
    Block(BlockReason),
    Remap { to: char },
}

impl InputDecision {
    /// The char appended to the buffer, if this decision inserts one.
    pub fn inserted_char(&self) -> Option<char> {
        match self {
            InputDecision::Accept { ch, .. } => Some(*ch),
            InputDecision::Remap { to } => Some(*to),
            _ => None,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, InputDecision::Block(_))
    }
}

/// Toggles for the word-boundary rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mechanics {
    /// A space must be typed explicitly at every word boundary.
    pub strict_space: bool,
    /// Typos must be fixed before crossing a word boundary.
    pub stop_on_error: bool,
    /// Enter counts as space at a boundary whose prefix is correct.
    pub enter_as_space: bool,
}

impl Default for Mechanics {
    fn default() -> Self {
        Self {
            strict_space: true,
            stop_on_error: true,
            enter_as_space: true,
        }
    }
}

pub const BOUNDARY: char = ' ';

/// Classify a key against the text typed so far.
///
/// Rules apply in order: system keys and chords, navigation, backspace,
/// non-character keys, typing past the end, the word-boundary gate, and
/// finally plain acceptance. Deletion is never blocked.
pub fn classify(
    key: &Key,
    modifiers: Modifiers,
    typed: &[char],
    target: &[char],
    mechanics: &Mechanics,
) -> InputDecision {
    if matches!(key, Key::Function(_)) || modifiers.is_chord() {
        return InputDecision::Ignore(IgnoreReason::System);
    }

    let c = match key {
        Key::Navigation(_) => return InputDecision::Ignore(IgnoreReason::Navigation),
        Key::Backspace => return InputDecision::Backspace,
        other => match other.produced_char() {
            Some(c) => c,
            None => return InputDecision::Ignore(IgnoreReason::Unmapped),
        },
    };

    let idx = typed.len();
    let Some(&expected) = target.get(idx) else {
        return InputDecision::Ignore(IgnoreReason::Extra);
    };

    if expected == BOUNDARY {
        if mechanics.stop_on_error && !is_correct_so_far(typed, target) {
            return InputDecision::Block(BlockReason::GateTyposPresent);
        }
        let is_enter = matches!(key, Key::Enter);
        if mechanics.strict_space && !key.is_space() && !is_enter {
            return InputDecision::Block(BlockReason::StrictSpaceBoundary);
        }
        if is_enter && mechanics.enter_as_space {
            return InputDecision::Remap { to: BOUNDARY };
        }
    }

    let classified_as = if c == expected {
        Outcome::Correct
    } else {
        Outcome::Incorrect
    };
    InputDecision::Accept { ch: c, classified_as }
}

/// Whether `typed` is a verbatim prefix of `target`.
pub fn is_correct_so_far(typed: &[char], target: &[char]) -> bool {
    target.starts_with(typed)
}

/// Index of the first typed char that differs from the target.
pub fn first_error(typed: &[char], target: &[char]) -> Option<usize> {
    typed
        .iter()
        .enumerate()
        .find(|&(idx, c)| target.get(idx) != Some(c))
        .map(|(idx, _)| idx)
}
