use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use lvc_core::{Config, HttpBackend};
use tracing::{info, warn};

mod app;
mod clipboard;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "lvc")]
#[command(version, about = "Terminal portal for AI analysis of LVC reports")]
struct Cli {
    /// Analysis backend base url (overrides LVC_BACKEND_URL and the config file)
    #[arg(long)]
    backend_url: Option<String>,

    /// Directory downloaded PDFs are saved to
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Store --backend-url and --download-dir in the config file for next time
    #[arg(long)]
    save_config: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(err) => (Config::new(), Some(err)),
    };

    let log_dir = Config::log_dir().unwrap_or_else(|_| std::env::temp_dir().join("lvc-portal"));
    let _log_guard = logging::init(&log_dir, cli.verbose, config.log_level.as_deref())?;

    if let Some(err) = config_error {
        warn!(error = %err, "ignoring unreadable config, using defaults");
    }

    if cli.save_config
        && config.remember(cli.backend_url.as_deref(), cli.download_dir.as_deref())
    {
        config.save()?;
        info!("saved command-line settings to config file");
    }

    let backend_url = cli.backend_url.unwrap_or_else(|| config.backend_url());
    let download_dir = cli.download_dir.unwrap_or_else(|| config.download_dir());
    let backend = HttpBackend::with_timeout(&backend_url, config.request_timeout())?;
    info!(backend = %backend_url, download_dir = %download_dir.display(), "starting LVC portal");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, backend, download_dir).await;

    tui::restore()?;
    info!("exiting");
    result
}

async fn run(terminal: &mut Tui, backend: HttpBackend, download_dir: PathBuf) -> Result<()> {
    let mut events = EventHandler::new();
    let mut app = App::new(backend, download_dir, events.sender());

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event)?,
            None => break,
        }
    }

    Ok(())
}
