mod app;
mod handler;
mod tui;
mod ui;

use std::fs::{self, OpenOptions};
use std::sync::Arc;

use anyhow::{Context, Result};
use docchat_core::{ChatSession, ClipboardService, Config, HttpDocumentApi};

use crate::app::App;
use crate::tui::EventHandler;

/// Send log records to a file; the terminal belongs to the UI.
fn init_logging() -> Result<()> {
    let log_dir = dirs::cache_dir()
        .context("Could not determine cache directory")?
        .join("docchat");
    fs::create_dir_all(&log_dir)?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("docchat.log"))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = init_logging() {
        eprintln!("logging disabled: {e:#}");
    }

    let config = Config::load()?;
    let api_base = config.api_base();
    log::info!("using backend at {}", api_base);

    let api = Arc::new(HttpDocumentApi::new(&api_base));
    let session = ChatSession::new(ClipboardService::with_system_tiers());
    let mut app = App::new(session, api, api_base);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event);
        app.poll_tasks().await;
    }
    Ok(())
}
