mod api;
mod app;
mod auth;
mod board;
mod config;
mod error;
mod logging;
mod models;
mod parser;
mod routes;
mod session;
mod token_store;
mod ui;

use crate::api::HttpClient;
use crate::app::App;
use crate::config::Config;
use crate::routes::Route;
use crate::session::Session;
use crate::token_store::{default_token_path, FileTokenStore, MemoryTokenStore, TokenStore};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dotenv::dotenv;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::env;
use std::io;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::load()?;
    if let Err(err) = logging::init(&config) {
        eprintln!("Logging disabled: {}", err);
    }
    tracing::info!(api_url = %config.api_url, environment = ?config.environment, "starting");

    let store: Arc<dyn TokenStore> = match config.token_path.clone().or_else(default_token_path) {
        Some(path) => {
            let store = FileTokenStore::new(path);
            tracing::debug!(path = %store.path().display(), "using token file");
            Arc::new(store)
        }
        None => {
            tracing::warn!("no data directory; the session will not survive a restart");
            Arc::new(MemoryTokenStore::default())
        }
    };

    let session = Session::new(store.clone());
    let client = HttpClient::new(&config.api_url, store)?;

    // Optional start path, e.g. `todo-pro-tui /signup`
    let start = env::args()
        .nth(1)
        .and_then(|path| Route::from_path(&path))
        .unwrap_or(Route::Board);
    let app = App::new(session, client, start);

    // Setup terminal UI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.hide_cursor()?;

    let res = ui::run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = %err, "ui loop failed");
        eprintln!("Error: {:?}", err);
    }

    tracing::info!("exiting");
    Ok(())
}
