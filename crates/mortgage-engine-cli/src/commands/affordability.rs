use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_engine_core::affordability::{self, AffordabilityInput};
use mortgage_engine_core::payment::Compounding;
use mortgage_engine_core::CmhcRuleSet;

use crate::input;

/// Arguments for the affordability analysis
#[derive(Args)]
pub struct AffordabilityArgs {
    /// Gross annual household income
    #[arg(long)]
    pub income: Option<Decimal>,

    /// Non-housing debt payments per month
    #[arg(long, default_value = "0")]
    pub monthly_debts: Decimal,

    /// Monthly heating cost estimate
    #[arg(long, default_value = "0")]
    pub heating: Decimal,

    /// Monthly property tax estimate
    #[arg(long, default_value = "0")]
    pub property_tax: Decimal,

    /// Monthly condo fees
    #[arg(long, default_value = "0")]
    pub condo_fees: Decimal,

    /// Cash available for the down payment
    #[arg(long)]
    pub down: Option<Decimal>,

    /// Contract rate in percent
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Amortization in years
    #[arg(long, default_value = "25")]
    pub years: u32,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_affordability(args: AffordabilityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let afford_input: AffordabilityInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        AffordabilityInput {
            gross_annual_income: args.income.ok_or("--income is required (or provide --input)")?,
            monthly_debt_payments: args.monthly_debts,
            monthly_heating: args.heating,
            monthly_property_tax: args.property_tax,
            monthly_condo_fees: args.condo_fees,
            down_payment_available: args.down.ok_or("--down is required (or provide --input)")?,
            annual_rate_percent: args.rate.ok_or("--rate is required (or provide --input)")?,
            amortization_years: args.years,
            compounding: Compounding::Nominal,
            is_first_time_buyer: false,
            is_new_build: false,
            rules: CmhcRuleSet::cmhc_2025(),
        }
    };

    let result = affordability::analyze_affordability(&afford_input)?;
    Ok(serde_json::to_value(result)?)
}
