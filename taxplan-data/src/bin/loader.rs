use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use taxplan_data::{SectionLimitLoader, TaxBracketLoader};
use taxplan_db_sqlite::SqliteRepository;

/// Load slab schedules and section limits from CSV files into the database.
///
/// Bracket CSV columns: financial_year, regime (new|old), min_income,
/// max_income (empty for the top slab), base_tax, rate.
///
/// Limit CSV columns: financial_year, section, limit (0 for uncapped).
#[derive(Parser, Debug)]
#[command(name = "taxplan-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// CSV file with slab schedules
    #[arg(short, long)]
    brackets: Option<PathBuf>,

    /// CSV file with section limits
    #[arg(short, long)]
    limits: Option<PathBuf>,

    /// SQLite database path or URL; the file is created if missing
    #[arg(short, long, default_value = "sqlite:taxplan.db")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        println!("Running seeds from: {}", seeds_dir.display());
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        println!("Seeds complete.");
    }

    if let Some(path) = &args.brackets {
        println!("Loading tax brackets from: {}", path.display());
        let file = File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        let records = TaxBracketLoader::parse(file)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
        println!("Parsed {} records from CSV", records.len());

        let inserted = TaxBracketLoader::load(&repo, &records)
            .await
            .context("Failed to load tax brackets into database")?;
        println!("Successfully loaded {} tax brackets into the database.", inserted);
    }

    if let Some(path) = &args.limits {
        println!("Loading section limits from: {}", path.display());
        let file = File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        let records = SectionLimitLoader::parse(file)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;

        let stored = SectionLimitLoader::load(&repo, &records)
            .await
            .context("Failed to load section limits into database")?;
        println!("Successfully stored {} section limits.", stored);
    }

    if args.brackets.is_none() && args.limits.is_none() && args.seeds.is_none() && !args.migrate {
        println!("Nothing to do; pass --brackets, --limits, --migrate or --seeds.");
    }

    Ok(())
}
