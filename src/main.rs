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
use roundcount::{
    app::{App, Control},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore, GoalAction},
    cue::{CueWorker, SystemPlayer},
    logging,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner, TICK_RATE_MS},
    visitors::{count_visit_in_background, SqliteVisitorCounter},
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, Instant},
};

/// calibrate one round, set a goal, and let the terminal count the rest
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Time one round of your practice, set how many rounds you want, and the counter advances on its own until the goal is reached and a cue plays."
)]
pub struct Cli {
    /// goal used at start and after every reset
    #[clap(short = 'g', long)]
    goal: Option<u32>,

    /// fixed offset added to every calibrated round, in milliseconds
    #[clap(long)]
    calibration_offset_ms: Option<u64>,

    /// what to play when the goal is reached
    #[clap(short = 'a', long, value_enum)]
    action: Option<GoalAction>,

    /// text spoken by the speech action
    #[clap(long)]
    cue_text: Option<String>,

    /// how many times the cue is played back to back
    #[clap(short = 'n', long)]
    cue_repeat: Option<u32>,

    /// audio file played by the clip action
    #[clap(long)]
    clip: Option<PathBuf>,

    /// text-to-speech command; the cue text is passed as the last argument
    #[clap(long)]
    speech_command: Option<String>,

    /// do not touch the shared visitor counter
    #[clap(long)]
    no_visitors: bool,

    /// write the effective settings to the config file
    #[clap(long)]
    save_config: bool,

    /// print the effective settings as JSON and exit
    #[clap(long)]
    print_config: bool,

    /// log level used when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Command-line values win over the stored config.
    fn apply_to(&self, mut cfg: Config) -> Config {
        if let Some(goal) = self.goal {
            cfg.default_goal = goal;
        }
        if let Some(offset) = self.calibration_offset_ms {
            cfg.calibration_offset_ms = offset;
        }
        if let Some(action) = self.action {
            cfg.goal_action = action;
        }
        if let Some(text) = &self.cue_text {
            cfg.cue_text = text.clone();
        }
        if let Some(repeat) = self.cue_repeat {
            cfg.cue_repeat = repeat;
        }
        if let Some(clip) = &self.clip {
            cfg.clip_path = Some(clip.clone());
        }
        if let Some(cmd) = &self.speech_command {
            cfg.speech_command = Some(cmd.clone());
        }
        if self.no_visitors {
            cfg.count_visitors = false;
        }
        cfg
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let log_dir = AppDirs::log_dir().unwrap_or_else(|| PathBuf::from("."));
    let _log_guard = logging::init_tracing(&log_dir, &cli.log_level)?;

    let store = FileConfigStore::new();
    let config = cli.apply_to(store.load());

    if cli.save_config {
        store.save(&config)?;
    }
    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    tracing::info!(
        goal = config.default_goal,
        action = %config.goal_action,
        offset_ms = config.calibration_offset_ms,
        "starting"
    );

    let mut app = App::new(config.clone()).with_cue_worker(CueWorker::spawn(SystemPlayer::new(&config)));
    if config.count_visitors {
        app = app.with_visitor_count(count_visit_in_background(SqliteVisitorCounter::new));
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "exited with error");
    }
    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        match runner.step() {
            AppEvent::Tick => app.on_tick(Instant::now()),
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if app.on_key(key, Instant::now()) == Control::Quit {
                    tracing::info!(rounds = app.timer.round_count(), "quit");
                    break;
                }
            }
        }
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["roundcount"]);

        assert_eq!(cli.goal, None);
        assert_eq!(cli.calibration_offset_ms, None);
        assert_eq!(cli.action, None);
        assert!(!cli.no_visitors);
        assert!(!cli.print_config);
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_cli_defaults_keep_config() {
        let cli = Cli::parse_from(["roundcount"]);
        let cfg = Config {
            default_goal: 108,
            ..Config::default()
        };
        assert_eq!(cli.apply_to(cfg.clone()), cfg);
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "roundcount",
            "-g",
            "21",
            "--calibration-offset-ms",
            "10000",
            "-a",
            "tone",
            "-n",
            "5",
            "--cue-text",
            "well done",
            "--no-visitors",
        ]);
        let cfg = cli.apply_to(Config::default());

        assert_eq!(cfg.default_goal, 21);
        assert_eq!(cfg.calibration_offset_ms, 10_000);
        assert_eq!(cfg.goal_action, GoalAction::Tone);
        assert_eq!(cfg.cue_repeat, 5);
        assert_eq!(cfg.cue_text, "well done");
        assert!(!cfg.count_visitors);
    }

    #[test]
    fn test_cli_clip_and_speech_command() {
        let cli = Cli::parse_from([
            "roundcount",
            "--action",
            "clip",
            "--clip",
            "/tmp/bell.ogg",
            "--speech-command",
            "espeak -s 120",
        ]);
        let cfg = cli.apply_to(Config::default());
        assert_eq!(cfg.goal_action, GoalAction::Clip);
        assert_eq!(cfg.clip_path, Some(PathBuf::from("/tmp/bell.ogg")));
        assert_eq!(cfg.speech_command.as_deref(), Some("espeak -s 120"));
    }

    #[test]
    fn test_cli_rejects_unknown_action() {
        assert!(Cli::try_parse_from(["roundcount", "--action", "gong"]).is_err());
    }

    #[test]
    fn test_cli_command_is_valid() {
        Cli::command().debug_assert();
    }
}
