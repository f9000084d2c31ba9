use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_engine_core::calculator::{self, CalculationInput};
use mortgage_engine_core::CmhcRuleSet;

use crate::input;

use super::{CompoundingArg, FrequencyArg};

/// Arguments for the full mortgage calculation pipeline
#[derive(Args)]
pub struct CalculateArgs {
    /// Purchase price of the property
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Down payment in dollars
    #[arg(long)]
    pub down: Option<Decimal>,

    /// Quoted annual rate in percent (5.79 = 5.79%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Amortization in years
    #[arg(long, default_value = "25")]
    pub years: u32,

    /// Payment frequency
    #[arg(long, value_enum, default_value = "monthly")]
    pub frequency: FrequencyArg,

    /// Rate compounding convention
    #[arg(long, value_enum, default_value = "nominal")]
    pub compounding: CompoundingArg,

    /// Any borrower is a first-time buyer
    #[arg(long)]
    pub first_time_buyer: bool,

    /// Property is new construction
    #[arg(long)]
    pub new_build: bool,

    /// Down payment is borrowed rather than saved
    #[arg(long)]
    pub non_traditional: bool,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_calculate(args: CalculateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let calc_input: CalculationInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        CalculationInput {
            purchase_price: args.price.ok_or("--price is required (or provide --input)")?,
            down_payment: args.down.ok_or("--down is required (or provide --input)")?,
            annual_rate_percent: args.rate.ok_or("--rate is required (or provide --input)")?,
            amortization_years: args.years,
            frequency: args.frequency.into(),
            compounding: args.compounding.into(),
            is_first_time_buyer: args.first_time_buyer,
            is_new_build: args.new_build,
            is_traditional_down_payment: !args.non_traditional,
            rules: CmhcRuleSet::cmhc_2025(),
        }
    };

    let result = calculator::calculate(&calc_input)?;
    Ok(serde_json::to_value(result)?)
}
