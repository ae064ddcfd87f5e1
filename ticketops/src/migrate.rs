//! ticketops-migrate - copy a dataset between two database deployments
//!
//! Copies the tickets and classifiers collections from a source database
//! file to a target, recreates the custom indexes under their original
//! names, and verifies per-collection document counts. A count mismatch is
//! reported as a warning; the migration is still considered complete.

mod prompt;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use ticketops_core::db::COLLECTIONS;
use ticketops_core::migrate::migrate_database;
use ticketops_core::{Config, Database};

#[derive(Parser)]
#[command(name = "ticketops-migrate")]
#[command(about = "Migrate collections between two database deployments")]
#[command(version)]
struct Args {
    /// Source database path
    #[arg(long)]
    source: PathBuf,

    /// Target database path
    #[arg(long)]
    target: PathBuf,

    /// Skip the confirmation prompts
    #[arg(short, long)]
    yes: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        ticketops_core::logging::init(&config.logging).context("failed to initialize logging")?;

    println!("Source: {}", args.source.display());
    println!("Target: {}", args.target.display());
    tracing::info!(
        source = %args.source.display(),
        target = %args.target.display(),
        "Starting migration"
    );

    // An unreachable deployment is fatal to the operation; no retry.
    let source = Database::open(&args.source)
        .with_context(|| format!("failed to open source database {}", args.source.display()))?;
    source
        .migrate()
        .context("failed to prepare source database")?;

    println!("\nCollections to migrate:");
    for collection in COLLECTIONS {
        let count = source
            .count_collection(collection)
            .with_context(|| format!("failed to count {}", collection))?;
        println!("  {:<12} {} documents", collection, count);
    }

    if !prompt::confirm(
        "Proceed with the migration? Target collections will be dropped and rewritten.",
        args.yes,
    )? {
        println!("Migration cancelled");
        return Ok(());
    }

    let target = Database::open(&args.target)
        .with_context(|| format!("failed to open target database {}", args.target.display()))?;

    let report = migrate_database(&source, &target).context("migration failed")?;

    println!("\nMigration report:");
    for collection in &report.collections {
        println!("  {}:", collection.name);
        if collection.skipped_empty {
            println!("    source empty, skipped");
        } else {
            println!("    documents copied: {}", collection.documents_copied);
            println!("    indexes copied:   {}", collection.indexes_copied);
            for failure in &collection.index_failures {
                println!("    index failed:     {}", failure);
            }
        }
    }

    println!("\nVerification:");
    for collection in &report.collections {
        let marker = if collection.counts_match() {
            "ok"
        } else {
            "MISMATCH"
        };
        println!(
            "  {:<12} source {} / target {} [{}]",
            collection.name, collection.source_count, collection.target_count, marker
        );
    }

    if report.passed() {
        println!("\nMigration completed successfully");
    } else {
        println!("\nWarning: migration completed with count mismatches; review the report above");
    }

    Ok(())
}
