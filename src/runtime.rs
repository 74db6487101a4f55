use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::key::KeyInput;

/// Unified event type consumed by the host loop
#[derive(Clone, Debug)]
pub enum HostEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// What the host should do with a key press.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostAction {
    Quit,
    /// Start over with fresh text.
    Restart,
    /// Hand the key to the session.
    Forward(KeyInput),
}

/// Split host shortcuts from keys meant for the session. Shortcuts are
/// chords, which the classifier ignores anyway, so they never collide.
pub fn host_action(key: &KeyEvent) -> HostAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => HostAction::Quit,
        KeyCode::Char('c') if ctrl => HostAction::Quit,
        KeyCode::Char('r') if ctrl => HostAction::Restart,
        _ => HostAction::Forward(KeyInput::from(*key)),
    }
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait HostEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<HostEvent, RecvTimeoutError>;
}

/// Production event source reading crossterm events on a background thread
pub struct CrosstermEventSource {
    rx: Receiver<HostEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // key releases and repeats would otherwise be typed twice
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    tx.send(HostEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(HostEvent::Resize),
                Ok(_) => Ok(()),
                Err(e) => {
                    tracing::warn!(error = %e, "terminal event reader stopped");
                    break;
                }
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HostEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<HostEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Channel-fed event source for headless tests
pub struct TestEventSource {
    rx: Receiver<HostEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<HostEvent>) -> Self {
        Self { rx }
    }
}

impl HostEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<HostEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the host one event at a time, yielding `Tick` when idle so the
/// live WPM keeps refreshing.
pub struct Runner<E: HostEventSource> {
    event_source: E,
    tick: Duration,
}

impl<E: HostEventSource> Runner<E> {
    pub fn new(event_source: E, tick: Duration) -> Self {
        Self { event_source, tick }
    }

    /// Blocks up to the tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> HostEvent {
        match self.event_source.recv_timeout(self.tick) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => HostEvent::Tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(1));

        assert!(matches!(runner.step(), HostEvent::Tick));
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(HostEvent::Resize).unwrap();
        let runner = Runner::new(TestEventSource::new(rx), Duration::from_millis(10));

        assert!(matches!(runner.step(), HostEvent::Resize));
    }

    #[test]
    fn escape_and_ctrl_c_quit() {
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(host_action(&esc), HostAction::Quit);
        assert_eq!(host_action(&ctrl_c), HostAction::Quit);
    }

    #[test]
    fn ctrl_r_restarts() {
        let key = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(host_action(&key), HostAction::Restart);
    }

    #[test]
    fn plain_keys_are_forwarded() {
        let key = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE);
        assert_eq!(host_action(&key), HostAction::Forward(KeyInput::char('r')));

        let key = KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE);
        assert_eq!(
            host_action(&key),
            HostAction::Forward(KeyInput::plain(Key::Backspace))
        );
    }
}
