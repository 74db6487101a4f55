//! Session lifecycle.
//!
//! [`SessionController`] is the only stateful component: it owns the target
//! text, the typed buffer and the journal, runs each key through
//! [`classify`], applies the decision, and hands back an immutable
//! [`SessionSnapshot`] computed by [`score`].

use crate::clock::{Clock, SystemClock};
use crate::error::SessionError;
use crate::journal::{Journal, JournalEntry};
use crate::key::{Key, KeyInput, Modifiers};
use crate::scoring::{score, CharacterState, SessionStats};
use crate::typing_policy::{classify, first_error, BlockReason, InputDecision, Mechanics};
use crate::word_generator::TextProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum Status {
    /// No target text loaded yet.
    Idle,
    Running,
    /// Terminal until the next `start`.
    Finished,
}

/// Immutable view of a session, safe to hand to any number of readers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub status: Status,
    pub character_states: Vec<CharacterState>,
    pub cursor_pos: usize,
    pub stats: SessionStats,
    pub is_finished: bool,
    pub journal_len: usize,
    /// Decision taken for the most recent key, if any.
    pub last_decision: Option<InputDecision>,
}

/// Where the first uncorrected typo sits when the gate blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FirstError {
    pub index: usize,
    pub expected: Option<char>,
    pub found: char,
}

/// Notifications pushed to an optional observer.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Started { target_len: usize },
    Decided { decision: InputDecision },
    Blocked {
        reason: BlockReason,
        first_error: Option<FirstError>,
    },
    Finished { stats: SessionStats },
}

pub type Observer = Box<dyn FnMut(&SessionEvent)>;

/// Mutable state of one session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub status: Status,
    pub target: Vec<char>,
    pub typed: Vec<char>,
    /// Set when the buffer first becomes non-empty.
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    /// When `start` was called; journal timestamps are relative to it.
    pub epoch: Instant,
    pub last_decision: Option<InputDecision>,
}

impl SessionState {
    fn idle(epoch: Instant) -> Self {
        Self {
            status: Status::Idle,
            target: Vec::new(),
            typed: Vec::new(),
            started_at: None,
            finished_at: None,
            epoch,
            last_decision: None,
        }
    }
}

pub struct SessionController<C: Clock = SystemClock> {
    clock: C,
    mechanics: Mechanics,
    state: SessionState,
    journal: Journal,
    observer: Option<Observer>,
}

impl SessionController<SystemClock> {
    pub fn new(mechanics: Mechanics) -> Self {
        Self::with_clock(mechanics, SystemClock)
    }
}

impl Default for SessionController<SystemClock> {
    fn default() -> Self {
        Self::new(Mechanics::default())
    }
}

impl<C: Clock> SessionController<C> {
    pub fn with_clock(mechanics: Mechanics, clock: C) -> Self {
        let epoch = clock.now();
        Self {
            clock,
            mechanics,
            state: SessionState::idle(epoch),
            journal: Journal::new(),
            observer: None,
        }
    }

    pub fn set_observer(&mut self, observer: Observer) {
        self.observer = Some(observer);
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    pub fn mechanics(&self) -> &Mechanics {
        &self.mechanics
    }

    pub fn status(&self) -> Status {
        self.state.status
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn target_text(&self) -> String {
        self.state.target.iter().collect()
    }

    pub fn typed_text(&self) -> String {
        self.state.typed.iter().collect()
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn entries(&self) -> &[JournalEntry] {
        self.journal.entries()
    }

    /// Begin a new session, discarding whatever came before.
    pub fn start<P: TextProvider + ?Sized>(&mut self, provider: &mut P) -> SessionSnapshot {
        let target = provider.provide_text();
        let now = self.clock.now();

        self.state = SessionState {
            status: Status::Running,
            target: target.chars().collect(),
            ..SessionState::idle(now)
        };
        self.journal.clear();

        let target_len = self.state.target.len();
        tracing::info!(target_len, "session started");
        self.emit(SessionEvent::Started { target_len });

        if self.state.target.is_empty() {
            self.finish(now);
        }
        self.snapshot()
    }

    /// Submit a raw host key identifier such as `"a"`, `"Enter"` or `"ArrowLeft"`.
    ///
    /// An empty identifier is a host bug and fails fast.
    pub fn submit_key(
        &mut self,
        key: &str,
        modifiers: Modifiers,
    ) -> Result<SessionSnapshot, SessionError> {
        let Some(key) = Key::parse(key) else {
            tracing::error!("host submitted a key event without a key identifier");
            return Err(SessionError::EmptyKey);
        };
        Ok(self.submit(&KeyInput::new(key, modifiers)))
    }

    /// Feed one key event through the classifier and apply the decision.
    ///
    /// Outside of `Running` this is a no-op that returns the current snapshot.
    pub fn submit(&mut self, input: &KeyInput) -> SessionSnapshot {
        if self.state.status != Status::Running {
            tracing::trace!(status = %self.state.status, "key ignored outside a running session");
            return self.snapshot();
        }

        let decision = classify(
            &input.key,
            input.modifiers,
            &self.state.typed,
            &self.state.target,
            &self.mechanics,
        );
        tracing::debug!(?decision, typed_len = self.state.typed.len(), "key classified");
        self.state.last_decision = Some(decision);

        let previous = self.state.typed.clone();
        match decision {
            InputDecision::Accept { ch, .. } | InputDecision::Remap { to: ch } => {
                self.state.typed.push(ch);
            }
            InputDecision::Backspace => {
                self.state.typed.pop();
            }
            InputDecision::Block(reason) => self.report_block(reason),
            InputDecision::Ignore(_) => {}
        }

        let now = self.clock.now();
        if previous != self.state.typed {
            if self.state.started_at.is_none() && !self.state.typed.is_empty() {
                self.state.started_at = Some(now);
            }
            let timestamp = now.saturating_duration_since(self.state.epoch);
            self.journal
                .record(&previous, &self.state.typed, &self.state.target, timestamp);
        }
        self.emit(SessionEvent::Decided { decision });

        let snapshot = self.snapshot_at(now);
        if snapshot.is_finished {
            self.finish(now);
            return self.snapshot_at(now);
        }
        snapshot
    }

    /// Rewind the buffer and the journal to `cursor`.
    ///
    /// Only honored while running; a cursor past the buffer end is clamped.
    pub fn rewind_to(&mut self, cursor: usize) -> SessionSnapshot {
        if self.state.status == Status::Running {
            let cursor = cursor.min(self.state.typed.len());
            self.journal.truncate(cursor);
            // the kept log may predate later rewrites of the same positions
            self.state.typed = self.journal.replay_buffer();
            tracing::debug!(cursor, journal_len = self.journal.len(), "session rewound");
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_at(self.clock.now())
    }

    fn snapshot_at(&self, now: Instant) -> SessionSnapshot {
        let now = self.state.finished_at.unwrap_or(now);
        let scored = score(&self.state.target, &self.state.typed, self.state.started_at, now);
        SessionSnapshot {
            status: self.state.status,
            character_states: scored.character_states,
            cursor_pos: scored.cursor_pos,
            stats: scored.stats,
            is_finished: scored.is_finished,
            journal_len: self.journal.len(),
            last_decision: self.state.last_decision,
        }
    }

    fn finish(&mut self, now: Instant) {
        self.state.status = Status::Finished;
        self.state.finished_at = Some(now);
        let stats = self.snapshot_at(now).stats;
        tracing::info!(wpm = stats.wpm, accuracy = stats.accuracy, "session complete");
        self.emit(SessionEvent::Finished { stats });
    }

    fn report_block(&mut self, reason: BlockReason) {
        let first_error = first_error(&self.state.typed, &self.state.target).map(|index| {
            FirstError {
                index,
                expected: self.state.target.get(index).copied(),
                found: self.state.typed[index],
            }
        });

        match (reason, first_error) {
            (BlockReason::GateTyposPresent, Some(e)) => tracing::info!(
                %reason,
                index = e.index,
                expected = ?e.expected,
                found = ?e.found,
                "input blocked: fix typos before proceeding"
            ),
            _ => tracing::info!(%reason, "input blocked"),
        }

        self.emit(SessionEvent::Blocked {
            reason,
            first_error,
        });
    }

    fn emit(&mut self, event: SessionEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
    }
}

impl<C: Clock + fmt::Debug> fmt::Debug for SessionController<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("clock", &self.clock)
            .field("mechanics", &self.mechanics)
            .field("state", &self.state)
            .field("journal_len", &self.journal.len())
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::key::NavKey;
    use crate::scoring::CharState;
    use crate::typing_policy::{IgnoreReason, Outcome};
    use crate::word_generator::StaticText;
    use assert_matches::assert_matches;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn running(text: &str) -> (SessionController<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let mut session = SessionController::with_clock(Mechanics::default(), clock.clone());
        session.start(&mut StaticText(text.to_string()));
        (session, clock)
    }

    fn type_str<C: Clock>(session: &mut SessionController<C>, s: &str) -> SessionSnapshot {
        let mut last = session.snapshot();
        for c in s.chars() {
            last = session.submit(&KeyInput::char(c));
        }
        last
    }

    #[test]
    fn test_new_controller_is_idle() {
        let session = SessionController::new(Mechanics::default());
        assert_eq!(session.status(), Status::Idle);
        assert!(session.snapshot().character_states.is_empty());
    }

    #[test]
    fn test_submit_while_idle_is_noop() {
        let mut session = SessionController::new(Mechanics::default());
        let snap = session.submit(&KeyInput::char('a'));
        assert_eq!(snap.status, Status::Idle);
        assert_eq!(snap.journal_len, 0);
        assert_eq!(session.typed_text(), "");
    }

    #[test]
    fn test_scenario_a_exact_typing_finishes() {
        let (mut session, _) = running("cat");
        let snap = type_str(&mut session, "cat");

        assert!(snap.is_finished);
        assert_eq!(snap.status, Status::Finished);
        assert_eq!(snap.stats.accuracy, 100);
        assert!(snap
            .character_states
            .iter()
            .all(|c| c.state == CharState::Correct));
    }

    #[test]
    fn test_scenario_b_gate_blocks_space() {
        let (mut session, _) = running("cat dog");
        type_str(&mut session, "cxt");
        let snap = session.submit(&KeyInput::char(' '));

        assert_eq!(
            snap.last_decision,
            Some(InputDecision::Block(BlockReason::GateTyposPresent))
        );
        assert_eq!(session.typed_text(), "cxt");
        assert_eq!(snap.cursor_pos, 3);
    }

    #[test]
    fn test_gate_released_after_correction() {
        let (mut session, _) = running("cat dog");
        type_str(&mut session, "cxt");
        session.submit(&KeyInput::plain(Key::Backspace));
        session.submit(&KeyInput::plain(Key::Backspace));
        type_str(&mut session, "at");
        let snap = session.submit(&KeyInput::char(' '));

        assert_matches!(
            snap.last_decision,
            Some(InputDecision::Accept { ch: ' ', classified_as: Outcome::Correct })
        );
        assert_eq!(session.typed_text(), "cat ");
    }

    #[test]
    fn test_scenario_c_strict_space() {
        let (mut session, _) = running("a b");
        type_str(&mut session, "a");
        let snap = session.submit(&KeyInput::char('x'));
        assert_eq!(
            snap.last_decision,
            Some(InputDecision::Block(BlockReason::StrictSpaceBoundary))
        );
        assert_eq!(session.typed_text(), "a");
    }

    #[test]
    fn test_scenario_d_enter_remaps_to_space() {
        let (mut session, _) = running("a b");
        type_str(&mut session, "a");
        let snap = session.submit(&KeyInput::plain(Key::Enter));
        assert_eq!(snap.last_decision, Some(InputDecision::Remap { to: ' ' }));
        assert_eq!(session.typed_text(), "a ");
        assert_eq!(session.entries().last().and_then(|e| e.ch), Some(' '));
    }

    #[test]
    fn test_scenario_e_fresh_session_stats() {
        let (session, clock) = running("hello");
        clock.advance(Duration::from_secs(10));
        let snap = session.snapshot();
        assert_eq!(snap.stats.accuracy, 100);
        assert_eq!(snap.stats.wpm, 0);
    }

    #[test]
    fn test_mid_word_typo_keeps_typing() {
        let (mut session, _) = running("cat dog");
        let snap = type_str(&mut session, "cxt");
        assert_eq!(snap.cursor_pos, 3);
        assert_eq!(snap.character_states[1].state, CharState::Incorrect);
        assert!(snap.stats.accuracy < 100);
    }

    #[test]
    fn test_timer_starts_on_first_char() {
        let (mut session, clock) = running("abcdefghij");
        clock.advance(Duration::from_secs(5));
        assert!(session.state().started_at.is_none());

        session.submit(&KeyInput::char('a'));
        assert!(session.state().started_at.is_some());

        clock.advance(Duration::from_secs(30));
        let snap = type_str(&mut session, "bcdefghij");
        // 10 correct chars over 30s = 2 words in half a minute
        assert_eq!(snap.stats.wpm, 4);
    }

    #[test]
    fn test_stats_frozen_after_finish() {
        let (mut session, clock) = running("abcde");
        session.submit(&KeyInput::char('a'));
        clock.advance(Duration::from_secs(60));
        let done = type_str(&mut session, "bcde");
        clock.advance(Duration::from_secs(600));
        assert_eq!(session.snapshot().stats, done.stats);
        assert_eq!(done.stats.wpm, 1);
    }

    #[test]
    fn test_finished_rejects_input() {
        let (mut session, _) = running("hi");
        type_str(&mut session, "hi");
        let journal_len = session.journal().len();

        let snap = session.submit(&KeyInput::plain(Key::Backspace));
        assert_eq!(snap.status, Status::Finished);
        assert_eq!(session.typed_text(), "hi");
        assert_eq!(session.journal().len(), journal_len);
    }

    #[test]
    fn test_restart_discards_previous_session() {
        let (mut session, _) = running("hello");
        type_str(&mut session, "hex");

        let snap = session.start(&mut StaticText("dog".to_string()));
        assert_eq!(snap.status, Status::Running);
        assert_eq!(snap.journal_len, 0);
        assert_eq!(snap.character_states.len(), 3);
        assert_eq!(session.typed_text(), "");
        assert!(session.state().started_at.is_none());
        assert_eq!(session.target_text(), "dog");
    }

    #[test]
    fn test_empty_target_finishes_on_start() {
        let (session, _) = running("");
        assert_eq!(session.status(), Status::Finished);
        assert!(session.snapshot().is_finished);
    }

    #[test]
    fn test_ignored_keys_do_not_touch_journal() {
        let (mut session, _) = running("abc");
        session.submit(&KeyInput::char('a'));
        let before = session.journal().len();

        let snap = session.submit(&KeyInput::plain(Key::Navigation(NavKey::ArrowLeft)));
        assert_eq!(
            snap.last_decision,
            Some(InputDecision::Ignore(IgnoreReason::Navigation))
        );
        session.submit(&KeyInput::plain(Key::Function(12)));
        session.submit(&KeyInput::new(
            Key::Char('b'),
            Modifiers {
                ctrl: true,
                ..Modifiers::NONE
            },
        ));

        assert_eq!(session.journal().len(), before);
        assert_eq!(session.typed_text(), "a");
    }

    #[test]
    fn test_backspace_on_empty_buffer() {
        let (mut session, _) = running("abc");
        let snap = session.submit(&KeyInput::plain(Key::Backspace));
        assert_eq!(snap.last_decision, Some(InputDecision::Backspace));
        assert_eq!(snap.journal_len, 0);
    }

    #[test]
    fn test_submit_key_parses_identifiers() {
        let (mut session, _) = running("a b");
        session.submit_key("a", Modifiers::NONE).unwrap();
        let snap = session.submit_key("Enter", Modifiers::NONE).unwrap();
        assert_eq!(snap.cursor_pos, 2);
        session.submit_key("F5", Modifiers::NONE).unwrap();
        assert_eq!(session.typed_text(), "a ");
    }

    #[test]
    fn test_submit_key_empty_fails_fast() {
        let (mut session, _) = running("abc");
        assert_eq!(
            session.submit_key("", Modifiers::NONE),
            Err(SessionError::EmptyKey)
        );
    }

    #[test]
    fn test_journal_timestamps_relative_to_start() {
        let (mut session, clock) = running("ab");
        clock.advance(Duration::from_millis(120));
        session.submit(&KeyInput::char('a'));
        clock.advance(Duration::from_millis(80));
        session.submit(&KeyInput::char('b'));

        let ts = session
            .entries()
            .iter()
            .map(|e| e.timestamp)
            .collect::<Vec<_>>();
        assert_eq!(ts, vec![Duration::from_millis(120), Duration::from_millis(200)]);
    }

    #[test]
    fn test_replay_matches_buffer_throughout() {
        let (mut session, _) = running("the cat sat");
        let keys = [
            Key::Char('t'),
            Key::Char('x'),
            Key::Backspace,
            Key::Char('h'),
            Key::Char('e'),
            Key::Enter,
            Key::Char('c'),
            Key::Backspace,
            Key::Backspace,
            Key::Char(' '),
        ];
        for key in keys {
            session.submit(&KeyInput::plain(key));
            assert_eq!(
                session.journal().replay_cursor_position(),
                session.state().typed.len()
            );
        }
    }

    #[test]
    fn test_rewind_truncates_buffer_and_journal() {
        let (mut session, _) = running("hello");
        type_str(&mut session, "helx");

        let snap = session.rewind_to(2);
        assert_eq!(session.typed_text(), "he");
        assert_eq!(snap.cursor_pos, 2);
        assert_eq!(session.journal().replay_cursor_position(), 2);

        let snap = session.rewind_to(10);
        assert_eq!(snap.cursor_pos, 2);
    }

    #[test]
    fn test_rewind_restores_buffer_from_journal() {
        let (mut session, _) = running("abcd");
        type_str(&mut session, "ab");
        session.submit(&KeyInput::plain(Key::Backspace));
        session.submit(&KeyInput::plain(Key::Backspace));
        type_str(&mut session, "xy");

        session.rewind_to(1);
        assert_eq!(session.typed_text(), "a");
        assert_eq!(session.journal().replay_buffer(), session.state().typed);
        assert_eq!(session.journal().errors().count(), 0);
        assert_eq!(session.snapshot().stats.accuracy, 100);
    }

    #[test]
    fn test_observer_receives_events() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);

        let clock = ManualClock::new();
        let mut session = SessionController::with_clock(Mechanics::default(), clock);
        session.set_observer(Box::new(move |e: &SessionEvent| sink.borrow_mut().push(e.clone())));

        session.start(&mut StaticText("ab c".to_string()));
        type_str(&mut session, "ax");
        session.submit(&KeyInput::char(' '));

        let events = events.borrow();
        assert_eq!(events[0], SessionEvent::Started { target_len: 4 });
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Blocked {
                reason: BlockReason::GateTyposPresent,
                first_error: Some(FirstError {
                    index: 1,
                    expected: Some('b'),
                    found: 'x'
                })
            }
        )));
    }

    #[test]
    fn test_observer_sees_finish() {
        let finished = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&finished);

        let (mut session, _) = running("ok");
        session.set_observer(Box::new(move |e: &SessionEvent| {
            if let SessionEvent::Finished { stats } = e {
                *sink.borrow_mut() = Some(*stats);
            }
        }));
        type_str(&mut session, "ok");

        assert_eq!(finished.borrow().map(|s| s.accuracy), Some(100));
    }

    #[test]
    fn test_characters_states_track_target_len() {
        let (mut session, _) = running("ünï cødé");
        for c in "ünï cø".chars() {
            let snap = session.submit(&KeyInput::char(c));
            assert_eq!(snap.character_states.len(), 8);
        }
    }
}
