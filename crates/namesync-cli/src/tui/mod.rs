//! namesync TUI
//!
//! Terminal user interface for the shared name list.
//!
//! ## Layout
//!
//! - Header: server greeting and live update status
//! - Add field with its validation error
//! - Counters (total names, successful submissions) and sort mode
//! - Name list, with the record being edited shown as an input
//! - Status bar with the last server reply
//!
//! ## Keys
//!
//! - a: Add a name (Enter sends, Esc leaves the field)
//! - e / Enter: Edit selected name (Enter saves, Esc cancels)
//! - j/k or ↑/↓: Move selection
//! - r: Refresh list
//! - D: Delete all names
//! - g: Fetch greeting
//! - s: Cycle sort mode
//! - ?: Help
//! - q: Quit

mod app;
mod ui;

use std::fs::File;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use namesync_core::{Config, HttpTransport, Session, SessionOptions};

use app::{App, InputMode};

use crate::LOG_ENV;

/// Interval between terminal input polls
const KEY_POLL: Duration = Duration::from_millis(50);

/// Run the TUI application
pub async fn run(config: Config) -> Result<()> {
    // Initialize TUI logging (file-based, only if NAMESYNC_LOG is set)
    init_tui_logging(&config);

    let transport = HttpTransport::from_config(&config).context("Invalid backend address")?;
    let mut session = Session::new(Arc::new(transport), SessionOptions::from_config(&config));
    session.start().await;
    session.fetch_greeting();

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = App::new(session);

    // Run app
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    app.session.shutdown().await;

    result
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        // Check for status message timeout
        app.check_status_timeout();

        // Draw UI
        terminal.draw(|frame| ui::draw(frame, app))?;

        tokio::select! {
            biased;

            // Request completions, pushed snapshots and timers
            event = app.session.next_event() => {
                app.handle_session_event(event);
            }

            // Poll for terminal events
            _ = tokio::time::sleep(KEY_POLL) => {
                // Check for terminal events (non-blocking)
                if event::poll(Duration::from_millis(0))? {
                    if let Event::Key(key) = event::read()? {
                        // Only handle key press events (not release)
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }

                        // If help is showing, any key dismisses it
                        if app.show_help {
                            app.show_help = false;
                            continue;
                        }

                        match app.input_mode {
                            InputMode::Normal => handle_normal_mode(app, key.code, key.modifiers),
                            InputMode::Add | InputMode::Edit => {
                                handle_input_mode(app, key.code, key.modifiers)
                            }
                        }
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Handle key events in normal mode
fn handle_normal_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match code {
        // Quit
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        KeyCode::Char('k') | KeyCode::Up => {
            app.move_up();
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.move_down();
        }

        KeyCode::Char('a') => {
            app.enter_add_mode();
        }
        KeyCode::Char('e') | KeyCode::Enter => {
            app.edit_selected();
        }
        KeyCode::Char('r') => {
            app.refresh();
        }
        KeyCode::Char('D') => {
            app.delete_all();
        }
        KeyCode::Char('g') => {
            app.fetch_greeting();
        }
        KeyCode::Char('s') => {
            app.cycle_sort();
        }

        KeyCode::Char('?') => {
            app.toggle_help();
        }

        _ => {}
    }
}

/// Handle key events while typing into the add or edit field
fn handle_input_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match code {
        KeyCode::Esc => {
            app.cancel_input();
        }
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.cancel_input();
        }

        KeyCode::Enter => {
            app.confirm_input();
        }

        // Text input
        KeyCode::Char(c) => {
            app.insert_char(c);
        }
        KeyCode::Backspace => {
            app.delete_char();
        }
        KeyCode::Left => {
            app.cursor_left();
        }
        KeyCode::Right => {
            app.cursor_right();
        }

        _ => {}
    }
}

/// Initialize logging for TUI mode
///
/// Only initializes if NAMESYNC_LOG environment variable is set.
/// Logs to file (config.log_file or ./namesync-debug.log).
fn init_tui_logging(config: &Config) {
    let Ok(log_level) = std::env::var(LOG_ENV) else {
        return;
    };

    let log_path = config.log_path();

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "namesync_core={},namesync={}",
        log_level, log_level
    ));

    // Initialize file-based logging (ignore error if already initialized)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("TUI logging initialized to {:?}", log_path);
}
