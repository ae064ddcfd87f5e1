//! ticketops-refresh - recompute denormalized derived fields
//!
//! Re-projects every ticket's counters and timestamps from its stored event
//! history. Safe to re-run: the projection is idempotent. Per-ticket
//! failures are reported in the summary and never abort the batch.

mod prompt;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use ticketops_core::refresh::refresh_derived_fields;
use ticketops_core::{Config, Database};

#[derive(Parser)]
#[command(name = "ticketops-refresh")]
#[command(about = "Recompute derived ticket fields from event histories")]
#[command(version)]
struct Args {
    /// Database path (defaults to the configured location)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        ticketops_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let db_path = args.db.clone().unwrap_or_else(|| config.database_path());
    println!("Database: {}", db_path.display());
    tracing::info!(path = %db_path.display(), "Refreshing derived fields");

    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let total = db.count_collection("tickets")?;
    if total == 0 {
        println!("No tickets in the database. Run ticketops-seed first.");
        return Ok(());
    }
    println!("Found {} tickets to refresh", total);

    let already = db.count_with_derived_fields()?;
    if already > 0 {
        println!(
            "{} tickets already carry derived fields; they will be recalculated and overwritten.",
            already
        );
    }
    if !prompt::confirm("Refresh derived fields now?", args.yes)? {
        println!("Refresh cancelled");
        return Ok(());
    }

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message("refreshing tickets");

    let summary = refresh_derived_fields(&db, |done, _total| {
        pb.set_position(done as u64);
    })
    .context("failed to refresh derived fields")?;
    pb.finish_with_message("done");

    println!("\nProcessed: {}", summary.processed);
    println!("Updated:   {}", summary.updated);
    println!("Failed:    {}", summary.failed);
    if summary.failed > 0 {
        println!("Failures are logged with ticket ids; see the log file.");
    }

    print_statistics(&db).context("failed to compute statistics")?;

    Ok(())
}

fn print_statistics(db: &Database) -> Result<()> {
    let stats = db.derived_field_stats()?;

    println!("\nReopenings:");
    println!("  Total reopenings:          {}", stats.total_reopenings);
    println!("  Tickets with reopenings:   {}", stats.tickets_with_reopenings);
    println!("  Max reopenings per ticket: {}", stats.max_reopenings);

    println!("\nClosure dates:");
    println!("  Tickets in closed state:   {}", stats.closed_state_count);
    println!("  Tickets with closed_at:    {}", stats.closed_at_present_count);

    println!("\nComments:");
    println!("  Total comments:            {}", stats.total_comments);
    println!("  Average per ticket:        {:.2}", stats.avg_comments);
    println!("  Max per ticket:            {}", stats.max_comments);

    println!("\nState changes:");
    println!("  Total state changes:       {}", stats.total_state_changes);
    println!("  Average per ticket:        {:.2}", stats.avg_state_changes);
    println!("  Max per ticket:            {}", stats.max_state_changes);

    Ok(())
}
