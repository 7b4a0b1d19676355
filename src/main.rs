mod api;
mod app;
mod clipboard;
mod config;
mod error;
mod events;
mod generation;
mod models;
mod ui;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::Backend, prelude::*};
use std::fs::OpenOptions;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use api::GeminiClient;
use app::App;
use clipboard::{ArboardClipboard, ClipboardWriter};
use events::AppEvent;
use generation::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = config::load_config()?;
    let client = GeminiClient::from_config(&config)?;
    if !client.has_api_key() {
        warn!("no API key configured, every roll will fail until one is set");
    }
    info!(model = client.model(), "starting reply roulette");

    let orchestrator = Orchestrator::new(
        Arc::new(client),
        Duration::from_millis(config.pace_millis),
    );
    let mut clipboard = ArboardClipboard::new();
    let mut app = App::new(&config);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create channel for async events
    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();

    let res = run_app(
        &mut terminal,
        &mut app,
        &orchestrator,
        &mut clipboard,
        &tx,
        &mut rx,
    );

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {err:?}");
    }

    info!("exiting");
    Ok(())
}

/// Logs go to a file; stdout belongs to the terminal UI.
fn init_logging() {
    let Ok(log_path) = config::get_log_path() else {
        return;
    };
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("reply_roulette=info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn spawn_generation(
    app: &mut App,
    orchestrator: &Orchestrator,
    event_tx: &mpsc::UnboundedSender<AppEvent>,
) {
    let Some((session, source_text)) = app.start_generation() else {
        return;
    };

    tokio::spawn(generation::run_session(
        orchestrator.clone(),
        session,
        source_text,
        event_tx.clone(),
    ));
}

fn handle_keyboard_input(
    app: &mut App,
    key: KeyCode,
    modifiers: KeyModifiers,
    orchestrator: &Orchestrator,
    clipboard: &mut dyn ClipboardWriter,
    event_tx: &mpsc::UnboundedSender<AppEvent>,
) {
    match key {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            if app.exit_pending {
                app.quit();
            } else {
                app.exit_pending = true;
            }
            return;
        }
        KeyCode::Esc => {
            if app.show_help {
                app.show_help = false;
            } else {
                app.exit_pending = false;
            }
            return;
        }
        _ if app.exit_pending => {
            // Any other key cancels pending exit
            app.exit_pending = false;
        }
        _ => {}
    }

    if app.show_help {
        if key == KeyCode::Char('h') && modifiers.contains(KeyModifiers::CONTROL) {
            app.toggle_help();
        }
        return;
    }

    match key {
        KeyCode::Char('q') if modifiers.contains(KeyModifiers::CONTROL) => app.quit(),
        KeyCode::Char('h') if modifiers.contains(KeyModifiers::CONTROL) => app.toggle_help(),
        KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => app.reset(),
        KeyCode::Char('y') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.copy_selected(clipboard, event_tx);
        }
        KeyCode::F(n @ 1..=3) => app.copy_reply(usize::from(n - 1), clipboard, event_tx),
        KeyCode::Tab => app.select_next(),
        KeyCode::BackTab => app.select_previous(),

        KeyCode::Backspace => app.input.pop(),
        KeyCode::Enter if modifiers.contains(KeyModifiers::ALT) => app.input.push('\n'),
        KeyCode::Enter => spawn_generation(app, orchestrator, event_tx),

        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => app.input.push(c),

        _ => {}
    }
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    orchestrator: &Orchestrator,
    clipboard: &mut dyn ClipboardWriter,
    event_tx: &mpsc::UnboundedSender<AppEvent>,
    event_rx: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    loop {
        terminal
            .draw(|f| ui::render(f, app))
            .context("Failed to draw frame")?;

        // Apply everything the background tasks reported since the last frame
        while let Ok(app_event) = event_rx.try_recv() {
            app.handle_event(app_event);
        }

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_keyboard_input(
                        app,
                        key.code,
                        key.modifiers,
                        orchestrator,
                        clipboard,
                        event_tx,
                    );
                }
                Event::Paste(text) => {
                    app.input.push_str(&text.replace("\r\n", "\n").replace('\r', "\n"));
                }
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}
