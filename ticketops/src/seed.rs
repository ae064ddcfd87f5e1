//! ticketops-seed - populate the database with synthetic tickets
//!
//! Drops and reseeds the classifiers and tickets collections, then prints a
//! breakdown of what was generated.

mod prompt;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use ticketops_core::db::TransitionKind;
use ticketops_core::analytics::ClassifierScope;
use ticketops_core::seed::{seed_database, SeedOptions};
use ticketops_core::{Config, Database};

#[derive(Parser)]
#[command(name = "ticketops-seed")]
#[command(about = "Generate synthetic tickets into the database")]
#[command(version)]
struct Args {
    /// Number of tickets to generate
    #[arg(short, long, default_value = "100")]
    count: usize,

    /// Database path (defaults to the configured location)
    #[arg(long)]
    db: Option<PathBuf>,

    /// RNG seed for a reproducible dataset
    #[arg(long)]
    seed: Option<u64>,

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

    if !prompt::confirm(
        &format!(
            "This drops the tickets and classifiers collections and generates {} tickets. Continue?",
            args.count
        ),
        args.yes,
    )? {
        println!("Seed cancelled");
        return Ok(());
    }

    tracing::info!(path = %db_path.display(), count = args.count, "Seeding database");

    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let pb = ProgressBar::new(args.count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message("generating tickets");

    let options = SeedOptions {
        count: args.count,
        base_time: Utc::now(),
    };
    let summary = seed_database(&db, &mut rng, &options, |done, _total| {
        pb.set_position(done as u64);
    })
    .context("failed to seed database")?;
    pb.finish_with_message("done");

    println!(
        "\nSeeded {} classifiers and {} tickets",
        summary.classifiers, summary.tickets
    );

    print_statistics(&db).context("failed to compute statistics")?;

    Ok(())
}

fn print_statistics(db: &Database) -> Result<()> {
    println!("\nTickets by state:");
    for (state, count) in db.state_breakdown()? {
        println!("  {:<12} {}", state.as_str(), count);
    }

    println!("\nTickets by classifier:");
    for (classifier, count) in db.classification_breakdown()? {
        println!("  {:<24} {}", classifier, count);
    }

    let reopenings = db.count_transitions(None, &ClassifierScope::All, TransitionKind::Reopening)?;
    let closures = db.count_transitions(None, &ClassifierScope::All, TransitionKind::Closure)?;
    println!("\nTotal reopenings: {}", reopenings);
    println!("Total closures:   {}", closures);

    Ok(())
}
