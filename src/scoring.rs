use crate::util::rounded_percent;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Characters per word in the standard WPM convention.
pub const CHARS_PER_WORD: f64 = 5.0;

/// Below this many elapsed minutes (~60ms) WPM is reported as zero.
pub const MIN_ELAPSED_MINUTES: f64 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharState {
    Default,
    Correct,
    Incorrect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterState {
    pub ch: char,
    pub state: CharState,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub wpm: u32,
    /// Percentage in 0..=100
    pub accuracy: u8,
}

/// Result of scoring a typed buffer against its target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub character_states: Vec<CharacterState>,
    pub cursor_pos: usize,
    pub is_finished: bool,
    pub stats: SessionStats,
}

/// Score `typed` against `target`.
///
/// The typed buffer is clipped to the target length before comparison, so
/// typing past the end neither panics nor contributes to accuracy. Accuracy is
/// 100 for an empty buffer and WPM stays 0 until `started_at` is set and a
/// minimum amount of time has elapsed.
pub fn score(target: &[char], typed: &[char], started_at: Option<Instant>, now: Instant) -> Score {
    let clipped = &typed[..typed.len().min(target.len())];

    let mut correct = 0usize;
    let character_states = target
        .iter()
        .enumerate()
        .map(|(idx, &ch)| {
            let state = match clipped.get(idx) {
                None => CharState::Default,
                Some(&t) if t == ch => {
                    correct += 1;
                    CharState::Correct
                }
                Some(_) => CharState::Incorrect,
            };
            CharacterState { ch, state }
        })
        .collect::<Vec<_>>();

    let accuracy = rounded_percent(correct, clipped.len(), 100);

    let wpm = match started_at {
        Some(start) => {
            let elapsed_mins = now.saturating_duration_since(start).as_secs_f64() / 60.0;
            if elapsed_mins > MIN_ELAPSED_MINUTES {
                ((correct as f64 / CHARS_PER_WORD) / elapsed_mins).round() as u32
            } else {
                0
            }
        }
        None => 0,
    };

    Score {
        character_states,
        cursor_pos: clipped.len(),
        is_finished: clipped == target,
        stats: SessionStats { wpm, accuracy },
    }
}

/// Convenience wrapper over [`score`] for string slices.
pub fn score_text(target: &str, typed: &str, started_at: Option<Instant>, now: Instant) -> Score {
    let target = target.chars().collect::<Vec<_>>();
    let typed = typed.chars().collect::<Vec<_>>();
    score(&target, &typed, started_at, now)
}
