use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_engine_core::premium::{self, PremiumInput};
use mortgage_engine_core::CmhcRuleSet;

use crate::input;

/// Arguments for the insurance premium calculation
#[derive(Args)]
pub struct PremiumArgs {
    /// Loan amount before the premium is added
    #[arg(long)]
    pub loan: Option<Decimal>,

    /// Purchase price of the property
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Amortization in years
    #[arg(long, default_value = "25")]
    pub years: u32,

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

pub fn run_premium(args: PremiumArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let premium_input: PremiumInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        PremiumInput {
            loan_amount: args.loan.ok_or("--loan is required (or provide --input)")?,
            purchase_price: args.price.ok_or("--price is required (or provide --input)")?,
            amortization_years: args.years,
            is_first_time_buyer: args.first_time_buyer,
            is_new_build: args.new_build,
            is_traditional_down_payment: !args.non_traditional,
            rules: CmhcRuleSet::cmhc_2025(),
        }
    };

    let result = premium::analyze_premium(&premium_input)?;
    Ok(serde_json::to_value(result)?)
}
