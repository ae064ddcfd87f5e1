//! ticketops-dash - ticketing dataset dashboard
//!
//! Terminal UI issuing one aggregation query per widget against the ticket
//! store. Filters (date window, state, classifier) are explicit values owned
//! by the app and passed into every query.

mod app;
mod ui;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use ticketops_core::{Config, Database};

use crate::app::App;

#[derive(Parser)]
#[command(name = "ticketops-dash")]
#[command(about = "Ticketing dataset dashboard")]
#[command(version)]
struct Args {
    /// Database path (defaults to the configured location)
    #[arg(long)]
    db: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;

    // Log to file, not stdout, since we own the terminal
    let _log_guard =
        ticketops_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("ticketops-dash starting up");

    let db_path = args.db.unwrap_or_else(|| config.database_path());
    tracing::info!(path = %db_path.display(), "Opening database");

    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let mut app = App::new(db, config.dashboard);
    app.load_classifier_options()
        .context("failed to load classifiers")?;
    app.reload().context("failed to load dashboard data")?;

    // Setup terminal
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;

    tracing::info!("ticketops-dash shutting down");

    result
}

/// Run the main application loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
