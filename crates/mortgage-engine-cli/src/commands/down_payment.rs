use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_engine_core::down_payment::{self, DownPaymentInput};
use mortgage_engine_core::CmhcRuleSet;

use crate::input;

/// Arguments for the minimum down payment calculation
#[derive(Args)]
pub struct DownPaymentArgs {
    /// Purchase price of the property
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_down_payment(args: DownPaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let dp_input: DownPaymentInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        DownPaymentInput {
            purchase_price: args.price.ok_or("--price is required (or provide --input)")?,
            rules: CmhcRuleSet::cmhc_2025(),
        }
    };

    let result = down_payment::analyze_down_payment(&dp_input)?;
    Ok(serde_json::to_value(result)?)
}
