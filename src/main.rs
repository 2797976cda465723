mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin, BufRead, Write},
    thread,
    time::Duration,
};
use tracing::{info, Level};

use typist::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    logging,
    match_tracker::mismatches,
    runtime::{CrosstermEventSource, FixedTicker, Runner, TypistEvent},
    CorrectionPolicy, Mode, RoundRecord, SessionEngine, SessionState, StatsLog,
};

/// typing speed trainer: sentence rounds, timed runs, live correction
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// round type to start in
    #[clap(short = 'm', long, value_enum)]
    mode: Option<Mode>,

    /// how mistyped characters are handled while typing
    #[clap(short = 'c', long, value_enum)]
    correction: Option<CorrectionPolicy>,

    /// timed run length in seconds (15, 30, 60 or 120)
    #[clap(short = 's', long)]
    secs: Option<u64>,

    /// sentence bank: classic, pangrams or generated
    #[clap(short = 'b', long)]
    bank: Option<String>,

    /// line-based prompt instead of the full-screen interface (sentence mode only)
    #[clap(long)]
    plain: bool,

    /// store the effective settings as the new defaults
    #[clap(long)]
    save: bool,

    /// print every completed round as JSON on exit
    #[clap(long)]
    summary_json: bool,

    /// log verbosity (written to the state directory, never the terminal)
    #[clap(long, default_value_t = Level::WARN)]
    log_level: Level,
}

impl Cli {
    /// Flags override the stored configuration for this run.
    fn apply(&self, mut cfg: Config) -> Config {
        if let Some(mode) = self.mode {
            cfg.mode = mode;
        }
        if let Some(correction) = self.correction {
            cfg.correction = correction;
        }
        if let Some(secs) = self.secs {
            cfg.time_limit_secs = secs;
        }
        if let Some(bank) = &self.bank {
            cfg.sentence_bank = bank.clone();
        }
        cfg
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppScreen {
    Typing,
    Results,
    Stats,
}

#[derive(Debug)]
pub struct App {
    pub engine: SessionEngine,
    pub screen: AppScreen,
    /// Screen to return to when leaving the stats view.
    pub previous: AppScreen,
    pub status: Option<String>,
}

impl App {
    pub fn new(mut engine: SessionEngine) -> Self {
        engine.start_round();
        Self {
            engine,
            screen: AppScreen::Typing,
            previous: AppScreen::Typing,
            status: None,
        }
    }

    fn show_results(&mut self) {
        self.screen = AppScreen::Results;
        self.status = None;
    }

    fn toggle_stats(&mut self) {
        if self.screen == AppScreen::Stats {
            self.screen = self.previous;
        } else {
            self.previous = self.screen;
            self.screen = AppScreen::Stats;
        }
    }
}

/// Seconds counted down on the plain surface before timing starts.
const COUNTDOWN_SECS: u64 = 3;

/// What the event loop should do after a key press.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    /// A timed run just started; realign the tick schedule.
    Started,
    Quit,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut cmd = Cli::command();

    let store = FileConfigStore::new();
    let config = cli.apply(store.load());

    if let Err(e) = logging::init(&AppDirs::log_path(), cli.log_level) {
        eprintln!("warning: logging disabled: {e}");
    }

    let session_config = match config.session_config() {
        Ok(sc) => sc,
        Err(e) => cmd.error(ErrorKind::InvalidValue, e).exit(),
    };
    let bank = match config.load_sentence_bank() {
        Ok(bank) => bank,
        Err(e) => cmd.error(ErrorKind::InvalidValue, e).exit(),
    };
    if cli.save {
        store.save(&config)?;
    }
    info!(?config, "starting");

    let engine = SessionEngine::new(bank, StatsLog::new(), session_config);

    let log = if cli.plain {
        if session_config.mode == Mode::Timed {
            cmd.error(
                ErrorKind::ArgumentConflict,
                "--plain only supports sentence mode",
            )
            .exit();
        }
        let mut engine = engine;
        run_plain(&mut engine, stdin().lock(), io::stdout(), Duration::from_secs(1))?;
        engine.log().clone()
    } else {
        if !stdin().is_tty() {
            cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
        }

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let mut app = App::new(engine);
        let outcome = start_tui(&mut terminal, &mut app);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        outcome?;
        app.engine.log().clone()
    };

    if cli.summary_json {
        println!("{}", serde_json::to_string_pretty(log.records())?);
    }

    Ok(())
}

fn draw(app: &App, f: &mut Frame) {
    ui::screen::current_screen(app.screen).render(app, f);
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());

    loop {
        terminal.draw(|f| draw(app, f))?;

        match runner.step() {
            TypistEvent::Tick => on_tick(app),
            TypistEvent::Resize => {}
            TypistEvent::Key(key) => match handle_key(app, key) {
                Flow::Continue => {}
                Flow::Started => runner.realign(),
                Flow::Quit => break,
            },
        }
    }

    Ok(())
}

/// Only a running timed round consumes ticks.
fn on_tick(app: &mut App) {
    if app.engine.is_ticking() && app.engine.tick().is_some() {
        app.show_results();
    }
}

fn handle_key(app: &mut App, key: KeyEvent) -> Flow {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc => return Flow::Quit,
        KeyCode::Char('c') if ctrl => return Flow::Quit,
        KeyCode::Char('s') if ctrl => app.toggle_stats(),
        KeyCode::Char('t') if ctrl => {
            let mode = app.engine.mode().toggled();
            if app.engine.switch_mode(mode) {
                app.screen = AppScreen::Typing;
                app.status = Some(format!("switched to {mode} mode"));
            } else {
                app.status = Some("finish the current round first".to_string());
            }
        }
        KeyCode::Char('l') if ctrl => {
            let next = app.engine.config().time_limit.cycled().secs();
            app.status = Some(match app.engine.set_time_limit(next) {
                Ok(()) if app.engine.state() == SessionState::Active => {
                    format!("time limit {next}s applies from the next run")
                }
                Ok(()) => format!("time limit {next}s"),
                Err(e) => e.to_string(),
            });
        }
        KeyCode::Enter => return on_enter(app),
        KeyCode::Backspace if app.screen == AppScreen::Typing => {
            if app.engine.state() == SessionState::Active {
                let mut text = app.engine.buffer().to_string();
                text.pop();
                app.engine.input_changed(&text);
            }
        }
        KeyCode::Char(c) if !ctrl && app.screen == AppScreen::Typing => {
            let mut text = app.engine.buffer().to_string();
            text.push(c);
            if app.engine.input_changed(&text).is_some() {
                app.show_results();
            }
        }
        _ => {}
    }
    Flow::Continue
}

fn on_enter(app: &mut App) -> Flow {
    match app.screen {
        AppScreen::Results => {
            app.screen = AppScreen::Typing;
            app.engine.start_round();
            Flow::Continue
        }
        AppScreen::Stats => Flow::Continue,
        AppScreen::Typing => match (app.engine.state(), app.engine.mode()) {
            (SessionState::Idle, _) | (SessionState::Completed, _) => {
                app.engine.start_round();
                Flow::Continue
            }
            (SessionState::Armed, Mode::Timed) => {
                app.engine.ready();
                app.status = None;
                Flow::Started
            }
            _ => Flow::Continue,
        },
    }
}

/// Line-based surface: one submitted line per round, graded non-destructively.
///
/// `step` is the pause between countdown numbers.
fn run_plain<R: BufRead, W: Write>(
    engine: &mut SessionEngine,
    mut input: R,
    mut out: W,
    step: Duration,
) -> io::Result<()> {
    let mut line = String::new();

    loop {
        engine.start_round();
        writeln!(out, "\nROUND {}", engine.round())?;
        writeln!(out, "{}", "-".repeat(30))?;
        writeln!(out, "{}", engine.target())?;
        write!(out, "\nPress Enter when you're ready to start typing...")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        countdown(&mut out, step)?;
        engine.ready();
        write!(out, "Type here: ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let typed = line.trim_end_matches(['\r', '\n']).to_string();
        if let Some(record) = engine.submit_line(&typed) {
            write_results(&mut out, &record, engine.target(), &typed)?;
        }

        write!(out, "\nWould you like to continue? [y/n]: ")?;
        out.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        if !matches!(line.trim().to_lowercase().as_str(), "y" | "yes") {
            break;
        }
    }

    write_summary(&mut out, engine.log())
}

fn countdown<W: Write>(out: &mut W, step: Duration) -> io::Result<()> {
    for n in (1..=COUNTDOWN_SECS).rev() {
        write!(out, "\rStarting in {n}...")?;
        out.flush()?;
        thread::sleep(step);
    }
    writeln!(out, "\rGO!           ")
}

fn write_results<W: Write>(
    out: &mut W,
    record: &RoundRecord,
    target: &str,
    typed: &str,
) -> io::Result<()> {
    let tier = record.tier();
    writeln!(out, "\nYOUR RESULTS")?;
    writeln!(out, "Time Taken: {:.2} seconds", record.elapsed_secs())?;
    writeln!(out, "Typing Speed: {:.1} WPM", record.wpm())?;
    if let Some(accuracy) = record.accuracy() {
        writeln!(out, "Accuracy: {accuracy:.1}%")?;
    }
    writeln!(out, "\nPerformance: {}", tier.title())?;
    writeln!(out, "Message: {}", tier.message())?;

    let errors = mismatches(target, typed);
    if !errors.is_empty() || typed.chars().count() != target.chars().count() {
        writeln!(out, "\nERROR ANALYSIS:")?;
        writeln!(out, "Expected: {target}")?;
        writeln!(out, "You typed: {typed}")?;
        for m in errors {
            writeln!(
                out,
                "Position {}: Expected '{}', Got '{}'",
                m.position + 1,
                m.expected,
                m.got
            )?;
        }
    }
    Ok(())
}

fn write_summary<W: Write>(out: &mut W, log: &StatsLog) -> io::Result<()> {
    match log.aggregate() {
        None => writeln!(out, "\nNo rounds completed.")?,
        Some(agg) => {
            writeln!(out, "\nTotal Rounds: {}", agg.count)?;
            writeln!(out, "Average WPM: {:.1}", agg.avg_wpm)?;
            writeln!(out, "Best WPM: {:.1}", agg.best_wpm)?;
            if let (Some(avg), Some(best)) = (agg.avg_accuracy, agg.best_accuracy) {
                writeln!(out, "Average Accuracy: {avg:.1}%")?;
                writeln!(out, "Best Accuracy: {best:.1}%")?;
            }
        }
    }
    writeln!(out, "\nThank you for playing! Happy typing!")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use typist::{SentenceBank, SessionConfig};

    fn engine(sentence: &str) -> SessionEngine {
        let bank = SentenceBank::new("test", [sentence]).unwrap();
        SessionEngine::new(bank, StatsLog::new(), SessionConfig::default())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn cli_flags_override_stored_config() {
        let cli = Cli::parse_from(["typist", "-m", "timed", "-s", "30", "-c", "permissive"]);
        let cfg = cli.apply(Config::default());
        assert_eq!(cfg.mode, Mode::Timed);
        assert_eq!(cfg.time_limit_secs, 30);
        assert_eq!(cfg.correction, CorrectionPolicy::Permissive);
        assert_eq!(cfg.sentence_bank, "classic");
    }

    #[test]
    fn plain_round_reports_errors() {
        let mut engine = engine("cat");
        let input = Cursor::new("\ncbt\nn\n");
        let mut out = Vec::new();
        run_plain(&mut engine, input, &mut out, Duration::ZERO).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("ROUND 1"));
        assert!(text.contains("Starting in 3..."));
        assert!(text.contains("GO!"));
        assert!(text.find("GO!") < text.find("Type here: "));
        assert!(text.contains("Accuracy: 66.7%"));
        assert!(text.contains("Position 2: Expected 'a', Got 'b'"));
        assert!(text.contains("Total Rounds: 1"));
        assert_eq!(engine.log().len(), 1);
    }

    #[test]
    fn plain_stops_on_end_of_input() {
        let mut engine = engine("cat");
        let mut out = Vec::new();
        run_plain(&mut engine, Cursor::new(""), &mut out, Duration::ZERO).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("No rounds completed."));
    }

    #[test]
    fn typing_the_target_shows_results() {
        let mut app = App::new(engine("hi"));
        assert_eq!(handle_key(&mut app, key(KeyCode::Char('h'))), Flow::Continue);
        handle_key(&mut app, key(KeyCode::Char('x')));
        assert_eq!(app.engine.buffer(), "h");
        handle_key(&mut app, key(KeyCode::Char('i')));
        assert_eq!(app.screen, AppScreen::Results);

        on_enter(&mut app);
        assert_eq!(app.screen, AppScreen::Typing);
        assert_eq!(app.engine.state(), SessionState::Armed);
    }

    #[test]
    fn mode_toggle_refused_mid_round() {
        let mut app = App::new(engine("hello"));
        handle_key(&mut app, key(KeyCode::Char('h')));
        handle_key(&mut app, ctrl('t'));
        assert_eq!(app.engine.mode(), Mode::Sentence);
        assert_eq!(app.status.as_deref(), Some("finish the current round first"));
    }

    #[test]
    fn enter_starts_a_timed_run() {
        let mut app = App::new(engine("hello"));
        handle_key(&mut app, ctrl('t'));
        assert_eq!(app.engine.mode(), Mode::Timed);
        assert_eq!(handle_key(&mut app, key(KeyCode::Enter)), Flow::Started);
        assert!(app.engine.is_ticking());
    }

    #[test]
    fn ticks_outside_a_timed_run_are_not_forwarded() {
        let mut app = App::new(engine("hello"));
        handle_key(&mut app, key(KeyCode::Char('h')));
        on_tick(&mut app);
        assert_eq!(app.engine.state(), SessionState::Active);
        assert_eq!(app.screen, AppScreen::Typing);
        assert!(!app.engine.is_ticking());
    }

    #[test]
    fn ticks_drive_a_timed_run() {
        let mut app = App::new(engine("hello"));
        handle_key(&mut app, ctrl('t'));
        handle_key(&mut app, key(KeyCode::Enter));
        let before = app.engine.snapshot().remaining_secs;
        on_tick(&mut app);
        assert_eq!(
            app.engine.snapshot().remaining_secs,
            before.map(|s| s - 1)
        );
    }

    #[test]
    fn escape_and_ctrl_c_quit() {
        let mut app = App::new(engine("hello"));
        assert_eq!(handle_key(&mut app, key(KeyCode::Esc)), Flow::Quit);
        assert_eq!(handle_key(&mut app, ctrl('c')), Flow::Quit);
    }

    #[test]
    fn stats_screen_toggles_back() {
        let mut app = App::new(engine("hello"));
        handle_key(&mut app, ctrl('s'));
        assert_eq!(app.screen, AppScreen::Stats);
        handle_key(&mut app, ctrl('s'));
        assert_eq!(app.screen, AppScreen::Typing);
    }
}
