use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::debug;

use taxplan_cli::app::{self, Session};
use taxplan_cli::config::AppConfig;
use taxplan_cli::utils::{money, parse_amount};
use taxplan_cli::{logging, output};
use taxplan_core::{IncomeSources, SlotId, TaxRegime};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Income tax planner with a section-wise deduction wallet.
///
/// Computes tax under the new and old regimes, tracks investments per
/// deduction section and suggests how much more to invest.
#[derive(Debug, Parser)]
#[command(name = "taxplan", version)]
struct Cli {
    /// Planner configuration file (TOML). Uses the built-in 2024-25 tables
    /// when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database backend; overrides the config file.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Database connection string; overrides the config file.
    /// For SQLite this is a file path (e.g. `taxplan.db`) or `:memory:`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Financial year to work on, e.g. `2024-25`. Defaults to the configured
    /// year.
    #[arg(long, global = true)]
    year: Option<String>,

    /// Whose income and wallet to use.
    #[arg(long, global = true, default_value = "default")]
    user: String,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Log filter, e.g. `debug` or `taxplan_core=trace`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also append log output to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute tax for an income without touching stored data.
    Tax {
        /// Gross annual income.
        #[arg(long, value_parser = parse_amount)]
        income: Decimal,

        /// Regime to use; both are shown when omitted.
        #[arg(long, value_parser = parse_regime)]
        regime: Option<TaxRegime>,

        /// Deductions claimed (ignored by the new regime).
        #[arg(long, value_parser = parse_amount, default_value = "0")]
        deductions: Decimal,
    },

    /// Record or show income for the financial year.
    #[command(subcommand)]
    Income(IncomeCommand),

    /// Manage the deduction wallet.
    #[command(subcommand)]
    Wallet(WalletCommand),

    /// Tax with wallet deductions, wallet totals and an investment suggestion.
    Plan {
        #[arg(long, value_parser = parse_regime, default_value = "new")]
        regime: TaxRegime,

        /// Use this gross income instead of the stored income record.
        #[arg(long, value_parser = parse_amount)]
        income: Option<Decimal>,
    },
}

#[derive(Debug, Subcommand)]
enum IncomeCommand {
    /// Create or replace the income record.
    Set(IncomeArgs),
    /// Show the income record.
    Show,
}

#[derive(Debug, Args)]
struct IncomeArgs {
    #[arg(long, value_parser = parse_amount, default_value = "0")]
    salary: Decimal,
    #[arg(long, value_parser = parse_amount, default_value = "0")]
    business: Decimal,
    #[arg(long, value_parser = parse_amount, default_value = "0")]
    capital_gains: Decimal,
    #[arg(long, value_parser = parse_amount, default_value = "0")]
    other: Decimal,
}

#[derive(Debug, Subcommand)]
enum WalletCommand {
    /// Create every configured section that does not exist yet.
    Init,
    /// Add an investment to a section.
    Add {
        #[arg(long)]
        section: String,
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_amount)]
        amount: Decimal,
    },
    /// Change the amount of an investment.
    Update {
        id: SlotId,
        #[arg(long, value_parser = parse_amount)]
        amount: Decimal,
    },
    /// Rename an investment.
    Rename {
        id: SlotId,
        #[arg(long)]
        name: String,
    },
    /// Remove an investment.
    Delete { id: SlotId },
    /// Show sections, investments and totals.
    Show,
}

fn parse_regime(s: &str) -> Result<TaxRegime, String> {
    TaxRegime::parse(s).ok_or_else(|| format!("unknown regime '{s}' (expected 'new' or 'old')"))
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(cli.log_level.as_deref())?;
    if let Some(path) = &cli.log_file {
        logging::enable_file_logging(path)?;
    }

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend.clone() {
        config.database.backend = backend;
    }
    if let Some(db) = cli.db.clone() {
        config.database.connection_string = db;
    }

    let mut planner_config = config.planner;
    let other_year = cli
        .year
        .as_deref()
        .is_some_and(|year| year.trim() != planner_config.financial_year);
    if let Some(year) = &cli.year {
        planner_config.financial_year = year.trim().to_string();
    }

    debug!(backend = %config.database.backend, "Connecting to database");
    let repo = app::build_registry()
        .create(&config.database)
        .await
        .with_context(|| {
            format!(
                "Failed to open database '{}'",
                config.database.connection_string
            )
        })?;
    let planner_config = app::resolve_planner_config(&*repo, planner_config, other_year).await?;
    let session = Session::open(repo, planner_config, &cli.user).await?;

    run(&session, cli.command, cli.json).await
}

async fn run(
    session: &Session,
    command: Command,
    json: bool,
) -> Result<()> {
    match command {
        Command::Tax {
            income,
            regime,
            deductions,
        } => {
            let results = match regime {
                Some(regime) => vec![session.compute(income, regime, deductions)?],
                None => session.compare(income, deductions)?,
            };
            if json {
                println!("{}", output::json(&results)?);
            } else {
                print!("{}", output::tax_results(&results));
            }
        }

        Command::Income(IncomeCommand::Set(args)) => {
            let record = session
                .set_income(IncomeSources {
                    salary: args.salary,
                    business_income: args.business,
                    capital_gains: args.capital_gains,
                    other_income: args.other,
                })
                .await?;
            if json {
                println!("{}", output::json(&record)?);
            } else {
                print!("{}", output::income_record(&record));
            }
        }

        Command::Income(IncomeCommand::Show) => match session.income().await? {
            Some(record) if json => println!("{}", output::json(&record)?),
            Some(record) => print!("{}", output::income_record(&record)),
            None => println!("No income recorded for {}.", session.key()),
        },

        Command::Wallet(command) => run_wallet(session, command, json).await?,

        Command::Plan { regime, income } => {
            let plan = session.plan(regime, income).await?;
            if json {
                println!("{}", output::json(&plan)?);
            } else {
                print!("{}", output::plan(&plan));
            }
        }
    }

    Ok(())
}

async fn run_wallet(
    session: &Session,
    command: WalletCommand,
    json: bool,
) -> Result<()> {
    match command {
        WalletCommand::Init => {
            let created = session.init_wallet().await?;
            if created.is_empty() {
                println!("All configured sections already exist.");
            } else {
                let names: Vec<_> = created.iter().map(|c| c.as_str()).collect();
                println!("Created sections: {}", names.join(", "));
            }
        }
        WalletCommand::Add {
            section,
            name,
            amount,
        } => {
            let id = session.add_slot(&section, &name, amount).await?;
            println!("{id}");
        }
        WalletCommand::Update { id, amount } => {
            session.update_slot(id, amount).await?;
            println!("Updated {id} to {}", money(amount));
        }
        WalletCommand::Rename { id, name } => {
            session.rename_slot(id, &name).await?;
            println!("Renamed {id} to '{}'", name.trim());
        }
        WalletCommand::Delete { id } => {
            let removed = session.delete_slot(id).await?;
            println!("Deleted '{}' ({})", removed.name, money(removed.amount));
        }
        WalletCommand::Show => {
            let view = session.wallet();
            if json {
                println!("{}", output::json(&view)?);
            } else {
                print!("{}", output::wallet(&view));
            }
        }
    }

    Ok(())
}
