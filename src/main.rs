use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use smartscan_shell::config::Config;
use smartscan_shell::tui::{self, EventHandler, Tui};
use smartscan_shell::{handler, logging, ui, App};

#[derive(Parser, Debug)]
#[command(name = "smartscan")]
#[command(about = "OBD SmartScan: vehicle dashboard, assistant chat and CSV upload")]
#[command(version)]
struct Cli {
    /// Path to a JSON config file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    logging::init(&config.log_file()?)?;
    tracing::info!(api = %config.api_base_url, "starting smartscan");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, config).await;

    tui::restore()?;
    if let Err(err) = &result {
        tracing::error!(error = %err, "smartscan exited with an error");
    }
    result
}

async fn run(terminal: &mut Tui, config: Config) -> Result<()> {
    let mut events = EventHandler::new();
    let mut app = App::new(config, events.sender(), tui::measure_viewport());

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(&mut app, event)?;
    }

    // Unsubscribe from terminal events before the terminal is restored
    drop(events);
    tracing::info!("shutting down");
    Ok(())
}
