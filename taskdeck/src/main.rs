//! `taskdeck`: terminal Kanban client.
//!
//! Signs in against a task API, then shows the board. Configuration via CLI
//! flags, environment variables, or config file
//! (`~/.config/taskdeck/config.toml`).
//!
//! ```bash
//! cargo run --bin taskdeck -- --api-url http://localhost:8000/api
//!
//! # Or via environment variables
//! TASKDECK_API_URL=https://tasks.example.com/api cargo run
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use taskdeck::api::ApiClient;
use taskdeck::api::http::HttpBackend;
use taskdeck::app::{App, Command};
use taskdeck::auth::AuthController;
use taskdeck::config::{CliArgs, ClientConfig};
use taskdeck::engine::OptimisticEngine;
use taskdeck::session::{FileStore, TokenStore};
use taskdeck::store::{Store, Surface, UiEvent};
use taskdeck::ui;

/// Everything the event loop dispatches commands to.
struct Client {
    store: Arc<Store>,
    engine: OptimisticEngine<HttpBackend>,
    auth: AuthController<HttpBackend>,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // CLI args > config file > env > defaults.
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load configuration: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file; ratatui owns stdout.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(base_url = %config.base_url, "taskdeck starting");

    let (client, ui_rx) = build_client(&config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &client, ui_rx, &config).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("taskdeck exiting");
    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown so buffered
/// entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskdeck.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

fn build_client(config: &ClientConfig) -> io::Result<(Client, mpsc::Receiver<UiEvent>)> {
    let base = config.api_url().map_err(io::Error::other)?;
    let backend = HttpBackend::new(base).map_err(io::Error::other)?;

    let tokens = match config.session_file() {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using session file");
            TokenStore::open(FileStore::new(path), config.storage_key.clone())
        }
        None => {
            tracing::warn!("no data directory; session will not persist");
            TokenStore::in_memory()
        }
    };

    let (store, ui_rx) = Store::init(config);
    let api = Arc::new(ApiClient::new(
        backend,
        Arc::new(tokens),
        Arc::clone(&store),
        config.api_timeout,
    ));
    let client = Client {
        store,
        engine: OptimisticEngine::new(Arc::clone(&api)),
        auth: AuthController::new(api),
    };
    Ok((client, ui_rx))
}

/// Main application loop.
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    client: &Client,
    mut ui_rx: mpsc::Receiver<UiEvent>,
    config: &ClientConfig,
) -> io::Result<()> {
    let mut app = App::new(config.search_debounce);

    if client.auth.restore().await {
        if let Some(command) = app.on_event(UiEvent::Redirect(Surface::Board), Instant::now()) {
            dispatch(client, command);
        }
    }

    loop {
        // Step 1: copy store state and draw.
        app.sync(&client.store);
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Step 2: drain notifications and redirects (non-blocking).
        while let Ok(event) = ui_rx.try_recv() {
            if let Some(command) = app.on_event(event, Instant::now()) {
                dispatch(client, command);
            }
        }

        // Step 3: fire a due debounced search.
        if let Some(command) = app.tick(Instant::now()) {
            dispatch(client, command);
        }

        // Step 4: poll for terminal input.
        if event::poll(config.poll_timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(command) = app.handle_key_event(key, Instant::now()) {
                        dispatch(client, command);
                    }
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Hands a command to the engine or auth controller. Nothing here awaits;
/// results reach the UI through the store and its event channel.
fn dispatch(client: &Client, command: Command) {
    tracing::debug!(?command, "dispatch");
    match command {
        Command::Login(credentials) => {
            let auth = client.auth.clone();
            tokio::spawn(async move {
                let _ = auth.login(&credentials).await;
            });
        }
        Command::Register(registration) => {
            let auth = client.auth.clone();
            tokio::spawn(async move {
                let _ = auth.register(&registration).await;
            });
        }
        Command::ClearAuthError => client.store.with_auth(|auth| auth.clear_error()),
        Command::Logout => {
            let auth = client.auth.clone();
            tokio::spawn(async move { auth.logout().await });
        }
        Command::Refresh => {
            let engine = client.engine.clone();
            tokio::spawn(async move {
                let _ = engine.refresh().await;
            });
        }
        Command::Open(id) => {
            let engine = client.engine.clone();
            client.store.with_tasks(|tasks| tasks.set_current(None));
            tokio::spawn(async move {
                let _ = engine.fetch_task(&id).await;
            });
        }
        Command::Create(draft) => drop(client.engine.create(draft)),
        Command::Update { id, patch } => drop(client.engine.update(id, patch)),
        Command::ChangeStatus(change) => drop(client.engine.change_status(change.id, change.status)),
        Command::Delete(id) => drop(client.engine.delete(id)),
        Command::ApplyFilters(patch) => {
            let engine = client.engine.clone();
            tokio::spawn(async move {
                let _ = engine.apply_filters(patch).await;
            });
        }
        Command::ResetFilters => {
            let engine = client.engine.clone();
            tokio::spawn(async move {
                let _ = engine.reset_filters().await;
            });
        }
    }
}
