// Library surface for the terminal host and headless/integration tests.
// The classifier and scorer are pure; SessionController is the only stateful piece.
pub mod clock;
pub mod config;
pub mod error;
pub mod journal;
pub mod key;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod typing_policy;
pub mod ui;
pub mod util;
pub mod word_generator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, ExportError, SessionError};
pub use journal::{Journal, JournalEntry, JournalReport};
pub use key::{Key, KeyInput, Modifiers, NavKey};
pub use scoring::{score, CharState, CharacterState, Score, SessionStats};
pub use session::{SessionController, SessionEvent, SessionSnapshot, Status};
pub use typing_policy::{classify, BlockReason, IgnoreReason, InputDecision, Mechanics, Outcome};
pub use word_generator::{StaticText, TextProvider, WordGenConfig, WordGenerator};
