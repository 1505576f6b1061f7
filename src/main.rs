use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{enable_raw_mode, EnterAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use pktview::network::{event_channel, EventReceiver};
use pktview::terminal::{restore_terminal, RestoreGuard};
use pktview::{ui, App, Cli, Config};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!("hint: --server takes a base URL such as http://127.0.0.1:8080");
            return ExitCode::from(2);
        }
    };

    let _log_guard = match init_logging(&config.log_file) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("error: {err:#}");
            eprintln!("hint: point --log-file at a writable location");
            return ExitCode::from(2);
        }
    };

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(path: &Path) -> Result<WorkerGuard> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

fn run(config: Config) -> Result<()> {
    info!(server = %config.endpoints.base(), "starting viewer");

    let (tx, mut rx) = event_channel();
    let mut app = App::new(config.endpoints.clone(), tx);
    if config.start_live {
        app.start_live();
    }
    if let Some(file) = &config.upload_on_start {
        app.upload(&file.to_string_lossy());
    }

    enable_raw_mode().context("cannot switch terminal to raw mode")?;
    let _restore = RestoreGuard::new(restore_terminal);
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let res = run_app(&mut terminal, &mut app, &mut rx, config.tick);

    app.shutdown();
    info!("viewer closed");
    res.context("terminal loop failed")
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    rx: &mut EventReceiver,
    tick: Duration,
) -> io::Result<()> {
    loop {
        while let Ok(event) = rx.try_recv() {
            app.handle_net_event(event);
        }

        terminal.draw(|frame| ui::render_ui(frame, app))?;

        if event::poll(tick)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }
        if app.should_quit {
            return Ok(());
        }
    }
}
