use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

static LANG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/lang");

pub const DEFAULT_LANGUAGE: &str = "english";

/// Source of target text for a new session. The core treats the text as opaque.
pub trait TextProvider {
    fn provide_text(&mut self) -> String;
}

impl<F: FnMut() -> String> TextProvider for F {
    fn provide_text(&mut self) -> String {
        self()
    }
}

/// Always provides the same text, e.g. a custom prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticText(pub String);

impl TextProvider for StaticText {
    fn provide_text(&mut self) -> String {
        self.0.clone()
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Language {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

impl Language {
    /// Load an embedded word list by file stem, e.g. `"english"`.
    pub fn load(name: &str) -> Option<Self> {
        let file = LANG_DIR.get_file(format!("{name}.json"))?;
        let contents = file.contents_utf8()?;
        match serde_json::from_str(contents) {
            Ok(lang) => Some(lang),
            Err(e) => {
                tracing::warn!(language = name, error = %e, "unable to parse word list");
                None
            }
        }
    }
}

/// Configuration for word generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordGenConfig {
    pub word_count: usize,
    /// Words per line before a newline. Zero keeps everything on one line.
    pub words_per_line: usize,
}

/// Generates random practice text from a word list.
#[derive(Debug, Clone)]
pub struct WordGenerator {
    config: WordGenConfig,
    words: Vec<String>,
}

impl WordGenerator {
    pub fn new(config: WordGenConfig) -> Self {
        let words = Language::load(DEFAULT_LANGUAGE)
            .map(|lang| lang.words)
            .unwrap_or_default();
        Self::with_words(config, words)
    }

    pub fn with_words(config: WordGenConfig, words: Vec<String>) -> Self {
        Self { config, words }
    }

    pub fn config(&self) -> WordGenConfig {
        self.config
    }

    /// Generate text using the thread-local RNG.
    pub fn generate(&self) -> String {
        self.generate_with(&mut rand::thread_rng())
    }

    /// Pick `word_count` words, join them with spaces into lines of
    /// `words_per_line` words, and join the lines with newlines. A trailing
    /// newline is added when the word count fills the last line exactly.
    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let WordGenConfig {
            word_count,
            words_per_line,
        } = self.config;

        if word_count == 0 || self.words.is_empty() {
            return String::new();
        }

        let picked = (0..word_count)
            .filter_map(|_| self.words.choose(rng).map(String::as_str))
            .collect::<Vec<_>>();

        if words_per_line == 0 {
            return picked.join(" ");
        }

        let mut text = picked
            .chunks(words_per_line)
            .map(|line| line.join(" "))
            .collect::<Vec<_>>()
            .join("\n");

        if word_count % words_per_line == 0 {
            text.push('\n');
        }
        text
    }
}

impl TextProvider for WordGenerator {
    fn provide_text(&mut self) -> String {
        self.generate()
    }
}
