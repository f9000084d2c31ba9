use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_engine_core::heloc::{self, HelocInput};

use crate::input;

/// Arguments for the HELOC limit calculation
#[derive(Args)]
pub struct HelocArgs {
    /// Current appraised property value
    #[arg(long)]
    pub value: Option<Decimal>,

    /// Outstanding mortgage balance
    #[arg(long, default_value = "0")]
    pub balance: Decimal,

    /// HELOC interest rate in percent
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_heloc(args: HelocArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let heloc_input: HelocInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        HelocInput {
            property_value: args.value.ok_or("--value is required (or provide --input)")?,
            mortgage_balance: args.balance,
            annual_rate_percent: args.rate.ok_or("--rate is required (or provide --input)")?,
        }
    };

    let result = heloc::analyze_heloc(&heloc_input)?;
    Ok(serde_json::to_value(result)?)
}
