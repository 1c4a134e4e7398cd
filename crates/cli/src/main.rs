//! Boletos CLI - Installment previews and receivables reports.
//!
//! # Usage
//!
//! ```bash
//! # Preview 12 monthly installments, moved off weekends and holidays
//! boletos-cli schedule --start 2025-01-31 --count 12 --skip --amount 150
//!
//! # Every 15 days, weekends only
//! boletos-cli schedule --start 2025-01-06 --count 4 --every-days 15 --skip --calendar none
//!
//! # Print the dashboard figures from the configured Supabase project
//! boletos-cli report
//! boletos-cli report --json
//! ```
//!
//! # Commands
//!
//! - `schedule` - Preview installment due dates (no backend access)
//! - `report` - Dashboard summary computed from the live tables

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use boletos_admin::config::HolidaySource;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "boletos-cli")]
#[command(author, version, about = "Boletos CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview installment due dates
    Schedule {
        /// First due date (YYYY-MM-DD)
        #[arg(short, long)]
        start: NaiveDate,

        /// Number of installments
        #[arg(short, long)]
        count: u32,

        /// Days between installments (monthly when omitted)
        #[arg(long)]
        every_days: Option<u32>,

        /// Move dates off weekends and holidays
        #[arg(long)]
        skip: bool,

        /// Holiday calendar (`br` or `none`)
        #[arg(long, default_value = "br")]
        calendar: HolidaySource,

        /// YAML file with extra holiday dates
        #[arg(long)]
        holidays_file: Option<PathBuf>,

        /// Amount of each installment
        #[arg(short, long)]
        amount: Option<Decimal>,

        /// Description to suffix with the installment number
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Print the dashboard summary from the backend
    Report {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Schedule {
            start,
            count,
            every_days,
            skip,
            calendar,
            holidays_file,
            amount,
            description,
        } => {
            let request = commands::schedule::PreviewRequest {
                start,
                count,
                every_days,
                skip_non_business_days: skip,
                holidays: boletos_admin::config::HolidaySettings {
                    source: calendar,
                    extra_file: holidays_file,
                },
                amount,
                description,
            };
            commands::schedule::run(&request)?;
        }
        Commands::Report { json } => commands::report::run(json).await?,
    }
    Ok(())
}
