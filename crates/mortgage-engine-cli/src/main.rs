mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::affordability::AffordabilityArgs;
use commands::calculator::CalculateArgs;
use commands::down_payment::DownPaymentArgs;
use commands::heloc::HelocArgs;
use commands::payment::{PaymentArgs, ScheduleArgs};
use commands::premium::PremiumArgs;

/// CMHC-compliant mortgage calculations
#[derive(Parser)]
#[command(
    name = "mtg",
    version,
    about = "CMHC-compliant mortgage calculations",
    long_about = "A CLI for CMHC-compliant mortgage calculations with decimal precision. \
                  Supports minimum down payment tiering, 2025 default-insurance premium \
                  rates with surcharges, payment amortization and schedules, affordability \
                  stress testing, and HELOC limits."
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
    /// Minimum down payment for a purchase price
    DownPayment(DownPaymentArgs),
    /// Default-insurance premium for a loan
    Premium(PremiumArgs),
    /// Periodic payment for an amortizing loan
    Payment(PaymentArgs),
    /// Full amortization schedule
    Schedule(ScheduleArgs),
    /// Full pipeline: down payment check, premium, and payment
    Calculate(CalculateArgs),
    /// Maximum affordable purchase price under GDS/TDS and the stress test
    Affordability(AffordabilityArgs),
    /// Available HELOC credit limit
    Heloc(HelocArgs),
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
        Commands::DownPayment(args) => commands::down_payment::run_down_payment(args),
        Commands::Premium(args) => commands::premium::run_premium(args),
        Commands::Payment(args) => commands::payment::run_payment(args),
        Commands::Schedule(args) => commands::payment::run_schedule(args),
        Commands::Calculate(args) => commands::calculator::run_calculate(args),
        Commands::Affordability(args) => commands::affordability::run_affordability(args),
        Commands::Heloc(args) => commands::heloc::run_heloc(args),
        Commands::Version => {
            println!("mtg {}", env!("CARGO_PKG_VERSION"));
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
