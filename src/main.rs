use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use keyprint::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    input::{dispatch, Flow},
    runtime::{keyboard_enhancement_flags, AppEvent, CrosstermEventSource, FixedTicker, Runner},
    Backend, Controller, HttpBackend, TICK_RATE_MS,
};
use ratatui::{
    backend::{Backend as TerminalBackend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// terminal client for keystroke-dynamics training and identification
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Captures your typing rhythm, trains a keystroke-dynamics profile on a remote classification service, and predicts who is typing."
)]
pub struct Cli {
    /// base URL of the classification service (overrides the config file)
    #[clap(short = 'u', long)]
    api_url: Option<String>,

    /// path to the JSON config file
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// request timeout in seconds (overrides the config file)
    #[clap(long)]
    timeout_secs: Option<u64>,

    /// log filter (trace, debug, info, warn, error)
    #[clap(long, default_value = "info")]
    log_level: String,

    /// path of the log file
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// write the effective config to the config file and exit
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }

    fn apply_overrides(&self, mut cfg: Config) -> Config {
        if let Some(url) = &self.api_url {
            cfg.api_base_url = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            cfg.request_timeout_secs = secs;
        }
        cfg
    }
}

fn init_logging(cli: &Cli) -> io::Result<()> {
    let path = cli.log_file.clone().unwrap_or_else(AppDirs::log_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let store = cli.config_store();
    let config = cli.apply_overrides(store.load());

    if cli.save_config {
        store.save(&config)?;
        println!("{}", store.path().display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let backend = HttpBackend::new(
        config.api_base_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    info!(api = %backend.base_url(), "starting");
    let mut controller = Controller::new(backend, config.plan.clone());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let release_events = supports_keyboard_enhancement().unwrap_or(false);
    if release_events {
        execute!(stdout, PushKeyboardEnhancementFlags(keyboard_enhancement_flags()))?;
    } else {
        warn!("terminal does not report key releases; hold times will be zero");
    }

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut controller, !release_events);

    if release_events {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<T: TerminalBackend, B: Backend>(
    terminal: &mut Terminal<T>,
    controller: &mut Controller<B>,
    synthesize_release: bool,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let epoch = Instant::now();

    terminal.draw(|f| f.render_widget(&*controller, f.area()))?;
    loop {
        match runner.step() {
            AppEvent::Tick => continue,
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if dispatch(controller, &key, epoch, synthesize_release) == Flow::Quit {
                    info!("quit");
                    break;
                }
            }
        }
        terminal.draw(|f| f.render_widget(&*controller, f.area()))?;
    }

    Ok(())
}
