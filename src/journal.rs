//! Append-only edit journal.
//!
//! Entries are derived by diffing successive snapshots of the typed buffer
//! rather than from raw key events, so the journal records what actually
//! happened to the buffer. Replaying the entries moves a virtual cursor that
//! tracks the buffer length, which is what [`truncate`] uses to rewind.

use crate::error::ExportError;
use crate::util::{mean, std_dev};
use chrono::{DateTime, Local};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Insert,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Time since the session was started.
    #[serde(rename = "ts_us", with = "micros")]
    pub timestamp: Duration,
    pub action: Action,
    /// The inserted char. Deletes carry none.
    #[serde(rename = "char")]
    pub ch: Option<char>,
    pub expected: Option<char>,
    pub index: usize,
    pub is_error: bool,
}

impl JournalEntry {
    fn insert(timestamp: Duration, ch: char, expected: char, index: usize) -> Self {
        Self {
            timestamp,
            action: Action::Insert,
            ch: Some(ch),
            expected: Some(expected),
            index,
            is_error: ch != expected,
        }
    }

    fn delete(timestamp: Duration, index: usize) -> Self {
        Self {
            timestamp,
            action: Action::Delete,
            ch: None,
            expected: None,
            index,
            is_error: false,
        }
    }
}

/// Virtual cursor after replaying `entries` from an empty buffer.
pub fn replay_cursor_position(entries: &[JournalEntry]) -> usize {
    entries.iter().fold(0, |pos, e| step(pos, e))
}

/// Buffer reconstructed by replaying `entries` from an empty buffer.
pub fn replay_buffer(entries: &[JournalEntry]) -> Vec<char> {
    let mut buffer = Vec::new();
    for entry in entries {
        match (entry.action, entry.ch) {
            (Action::Insert, Some(ch)) => buffer.push(ch),
            (Action::Insert, None) => {}
            (Action::Delete, _) => {
                buffer.pop();
            }
        }
    }
    buffer
}

/// Prefix of `entries` whose replay ends at `cursor`.
///
/// Replay stops at the first entry reached while the virtual cursor already
/// sits at `cursor`. If the cursor is never reached the whole log is kept.
pub fn truncate(entries: &[JournalEntry], cursor: usize) -> &[JournalEntry] {
    let mut pos = 0;
    let mut cut = 0;
    for entry in entries {
        if pos == cursor {
            break;
        }
        pos = step(pos, entry);
        cut += 1;
    }
    &entries[..cut]
}

fn step(pos: usize, entry: &JournalEntry) -> usize {
    match entry.action {
        Action::Insert => pos + 1,
        Action::Delete => pos.saturating_sub(1),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Diff `previous` against `current` and append the resulting entries.
    ///
    /// Returns the entries appended by this call. Shrinking emits one delete
    /// per removed char starting from the tail; growing emits one insert per
    /// appended char that has an expected counterpart in `target`. A
    /// same-length rewrite is journaled as deletes back to the common prefix
    /// followed by inserts of the new tail.
    pub fn record(
        &mut self,
        previous: &[char],
        current: &[char],
        target: &[char],
        timestamp: Duration,
    ) -> &[JournalEntry] {
        let start = self.entries.len();

        if current.len() < previous.len() {
            self.push_deletes(previous.len(), current.len(), timestamp);
        } else if current.len() > previous.len() {
            self.push_inserts(previous.len(), current, target, timestamp);
        } else if current != previous {
            let common = previous
                .iter()
                .zip(current)
                .take_while(|(a, b)| a == b)
                .count();
            self.push_deletes(previous.len(), common, timestamp);
            self.push_inserts(common, current, target, timestamp);
        }

        &self.entries[start..]
    }

    fn push_deletes(&mut self, from_len: usize, to_len: usize, timestamp: Duration) {
        self.entries.extend(
            (to_len..from_len)
                .rev()
                .map(|index| JournalEntry::delete(timestamp, index)),
        );
    }

    fn push_inserts(&mut self, from: usize, current: &[char], target: &[char], timestamp: Duration) {
        for (index, &ch) in current.iter().enumerate().skip(from) {
            if let Some(&expected) = target.get(index) {
                self.entries
                    .push(JournalEntry::insert(timestamp, ch, expected, index));
            }
        }
    }

    pub fn replay_cursor_position(&self) -> usize {
        replay_cursor_position(&self.entries)
    }

    pub fn replay_buffer(&self) -> Vec<char> {
        replay_buffer(&self.entries)
    }

    /// Cut the log so that replaying it ends at `cursor`.
    pub fn truncate(&mut self, cursor: usize) {
        let keep = truncate(&self.entries, cursor).len();
        self.entries.truncate(keep);
    }

    pub fn errors(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter().filter(|e| e.is_error)
    }

    pub fn report(&self) -> JournalReport {
        let inserts = self
            .entries
            .iter()
            .filter(|e| e.action == Action::Insert)
            .collect::<Vec<_>>();
        let errors = self.errors().copied().collect::<Vec<_>>();
        let correct = inserts.iter().filter(|e| !e.is_error).count();

        let accuracy = if inserts.is_empty() {
            0.0
        } else {
            (correct as f64 / inserts.len() as f64) * 100.0
        };

        let intervals = inserts
            .iter()
            .tuple_windows()
            .map(|(a, b)| b.timestamp.saturating_sub(a.timestamp).as_secs_f64() * 1000.0)
            .collect::<Vec<f64>>();

        JournalReport {
            generated_at: Local::now(),
            total_events: self.entries.len(),
            inserts: inserts.len(),
            deletes: self.entries.len() - inserts.len(),
            accuracy,
            mean_interval_ms: mean(&intervals),
            interval_std_dev_ms: std_dev(&intervals),
            errors,
        }
    }

    /// Write the journal as CSV with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        let mut wtr = csv::Writer::from_writer(writer);
        for entry in &self.entries {
            wtr.serialize(entry)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }
}

/// Summary of a journal for debugging and reporting tools.
#[derive(Debug, Clone)]
pub struct JournalReport {
    pub generated_at: DateTime<Local>,
    pub total_events: usize,
    pub inserts: usize,
    pub deletes: usize,
    /// Share of inserts that matched their expected char, in percent.
    pub accuracy: f64,
    pub mean_interval_ms: Option<f64>,
    pub interval_std_dev_ms: Option<f64>,
    pub errors: Vec<JournalEntry>,
}

impl fmt::Display for JournalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total_events == 0 {
            return write!(f, "Log is empty.");
        }

        writeln!(f, "=== TYPING SESSION REPORT ===")?;
        writeln!(f, "Time:         {}", self.generated_at.format("%H:%M:%S"))?;
        writeln!(f, "Total Events: {}", self.total_events)?;
        writeln!(f, "Inserts:      {}", self.inserts)?;
        writeln!(f, "Backspaces:   {}", self.deletes)?;
        writeln!(f, "Accuracy:     {:.1}%", self.accuracy)?;
        writeln!(f, "Error Count:  {}", self.errors.len())?;
        if let (Some(m), Some(sd)) = (self.mean_interval_ms, self.interval_std_dev_ms) {
            writeln!(f, "Rhythm:       {m:.0} ms/key (sd {sd:.0} ms)")?;
        }
        writeln!(f)?;
        writeln!(f, "--- ERROR LIST ---")?;
        if self.errors.is_empty() {
            writeln!(f, "None! Perfect run.")?;
        } else {
            for e in &self.errors {
                writeln!(
                    f,
                    "[Index {}] Expected {:?} but typed {:?}",
                    e.index,
                    e.expected.unwrap_or_default(),
                    e.ch.unwrap_or_default()
                )?;
            }
        }
        write!(f, "=============================")
    }
}

mod micros {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_micros(u64::deserialize(d)?))
    }
}
