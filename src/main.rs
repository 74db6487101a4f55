use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};
use tracing_subscriber::EnvFilter;
use typegate::{
    config::{Config, ConfigStore, FileConfigStore},
    error::ExportError,
    journal::Journal,
    runtime::{host_action, CrosstermEventSource, HostAction, HostEvent, HostEventSource, Runner},
    session::{SessionController, Status},
    ui::TypingView,
    word_generator::{StaticText, TextProvider, WordGenerator},
};

const TICK_RATE_MS: u64 = 100;

/// terminal typing practice with a word-boundary gate and a replayable keystroke journal
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// number of words to generate
    #[clap(short = 'w', long)]
    number_of_words: Option<usize>,

    /// words per line; 0 keeps the whole text on one line
    #[clap(short = 'l', long)]
    words_per_line: Option<usize>,

    /// custom prompt to type instead of generated words
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// allow typing over a word boundary without pressing space
    #[clap(long)]
    no_strict_space: bool,

    /// let typos through word boundaries
    #[clap(long)]
    no_gate: bool,

    /// treat Enter as a plain newline instead of a space at word boundaries
    #[clap(long)]
    no_enter_as_space: bool,

    /// write the journal on exit (.json for JSON, anything else for CSV)
    #[clap(long)]
    journal_out: Option<PathBuf>,

    /// write logs to this file (filter with RUST_LOG)
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// persist the effective settings as the new defaults
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Layer command line overrides on top of the stored config.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(n) = self.number_of_words {
            config.word_count = n;
        }
        if let Some(n) = self.words_per_line {
            config.words_per_line = n;
        }
        if self.no_strict_space {
            config.mechanics.strict_space = false;
        }
        if self.no_gate {
            config.mechanics.stop_on_error = false;
        }
        if self.no_enter_as_space {
            config.mechanics.enter_as_space = false;
        }
        config
    }
}

/// Where new target text comes from on start and restart.
enum Prompt {
    Custom(StaticText),
    Generated(WordGenerator),
}

impl TextProvider for Prompt {
    fn provide_text(&mut self) -> String {
        match self {
            Prompt::Custom(text) => text.provide_text(),
            Prompt::Generated(generator) => generator.provide_text(),
        }
    }
}

pub struct App {
    session: SessionController,
    prompt: Prompt,
}

impl App {
    fn new(cli: &Cli, config: &Config) -> Self {
        let prompt = match &cli.prompt {
            Some(p) => Prompt::Custom(StaticText(p.clone())),
            None => Prompt::Generated(WordGenerator::new(config.word_gen_config())),
        };
        let mut app = Self {
            session: SessionController::new(config.mechanics),
            prompt,
        };
        app.restart();
        app
    }

    fn restart(&mut self) {
        self.session.start(&mut self.prompt);
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    // stderr belongs to the alternate screen, so logs only go to a file
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn export_journal(journal: &Journal, path: &Path) -> Result<(), ExportError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        std::fs::write(path, journal.to_json()?)?;
    } else {
        journal.write_csv(File::create(path)?)?;
    }
    tracing::info!(path = %path.display(), entries = journal.len(), "journal exported");
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let store = FileConfigStore::new();
    let config = cli.apply(store.load());
    if cli.save_config {
        store.save(&config)?;
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&cli, &config);
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );
    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result?;

    if let Some(path) = &cli.journal_out {
        export_journal(app.session.journal(), path)?;
    }

    Ok(())
}

fn start_tui<B: Backend, E: HostEventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E>,
) -> Result<(), Box<dyn Error>> {
    loop {
        let snapshot = app.session.snapshot();
        let report = (snapshot.status == Status::Finished).then(|| app.session.journal().report());
        terminal.draw(|f| {
            let view = TypingView::new(&snapshot);
            let view = match &report {
                Some(report) => view.with_report(report),
                None => view,
            };
            f.render_widget(view, f.area());
        })?;

        match runner.step() {
            HostEvent::Key(key) => match host_action(&key) {
                HostAction::Quit => break,
                HostAction::Restart => app.restart(),
                HostAction::Forward(input) => {
                    app.session.submit(&input);
                }
            },
            HostEvent::Resize | HostEvent::Tick => {}
        }
    }
    Ok(())
}
