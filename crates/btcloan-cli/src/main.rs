mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::loan::{RepayArgs, StatusArgs, ValidateArgs};
use commands::schedule::{PreviewArgs, ScheduleArgs};

/// BTC loan amortization and repayment analytics
#[derive(Parser)]
#[command(
    name = "btcl",
    version,
    about = "BTC loan amortization and repayment analytics",
    long_about = "A CLI for Bitcoin-denominated loan calculations with decimal precision. \
                  Builds annuity payment schedules, previews installments, reports \
                  repayment progress and overdue status, and models early repayment."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview monthly installment and total cost before applying
    Preview(PreviewArgs),
    /// Build the full monthly amortization schedule
    Schedule(ScheduleArgs),
    /// Report a loan's repayment progress and overdue status
    Status(StatusArgs),
    /// Apply an early repayment (partial or full)
    Repay(RepayArgs),
    /// Check an application against product limits
    Validate(ValidateArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Preview(args) => commands::schedule::run_preview(args),
        Commands::Schedule(args) => commands::schedule::run_schedule(args),
        Commands::Status(args) => commands::loan::run_status(args),
        Commands::Repay(args) => commands::loan::run_repay(args),
        Commands::Validate(args) => commands::loan::run_validate(args),
        Commands::Version => {
            println!("btcl {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
