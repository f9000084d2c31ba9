use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_engine_core::payment::{self, ScheduleInput};

use crate::input;

use super::{CompoundingArg, FrequencyArg};

/// Arguments for the periodic payment calculation
#[derive(Args)]
pub struct PaymentArgs {
    /// Amount financed (loan plus any insurance premium)
    #[arg(long)]
    pub principal: Option<Decimal>,

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
}

/// Arguments for amortization schedule generation
#[derive(Args)]
pub struct ScheduleArgs {
    /// Amount financed (loan plus any insurance premium)
    #[arg(long)]
    pub principal: Option<Decimal>,

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

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_payment(args: PaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let principal = args
        .principal
        .ok_or("--principal is required")?;
    let rate = args.rate.ok_or("--rate is required")?;

    let payment = payment::periodic_payment(
        principal,
        rate,
        args.years,
        args.frequency.into(),
        args.compounding.into(),
    )?;

    Ok(serde_json::json!({
        "result": { "periodic_payment": payment.round_dp(2).to_string() },
    }))
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule_input: ScheduleInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        ScheduleInput {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate_percent: args.rate.ok_or("--rate is required (or provide --input)")?,
            amortization_years: args.years,
            frequency: args.frequency.into(),
            compounding: args.compounding.into(),
        }
    };

    let result = payment::amortization_schedule(&schedule_input)?;
    Ok(serde_json::to_value(result)?)
}
