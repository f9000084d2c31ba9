//! Composite mortgage calculation.
//!
//! Orders the three leaf rules the way every consumer needs them: minimum
//! down payment check, loan = price - down, premium on the loan, then the
//! payment on loan + premium. Policy checks that belong to no single leaf
//! (insured amortization caps, below-minimum down payments) surface here as
//! warnings.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::down_payment;
use crate::error::MortgageEngineError;
use crate::payment::{self, Compounding};
use crate::premium::{self, PremiumInput};
use crate::rules::CmhcRuleSet;
use crate::types::{with_metadata, ComputationOutput, Money, PaymentFrequency, Percent, Rate};
use crate::EngineResult;

/// Everything a calculator UI supplies per recalculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationInput {
    pub purchase_price: Money,
    pub down_payment: Money,
    /// Quoted annual rate in percent (5.79 = 5.79%).
    pub annual_rate_percent: Percent,
    pub amortization_years: u32,
    #[serde(default)]
    pub frequency: PaymentFrequency,
    #[serde(default)]
    pub compounding: Compounding,
    #[serde(default)]
    pub is_first_time_buyer: bool,
    #[serde(default)]
    pub is_new_build: bool,
    #[serde(default = "default_true")]
    pub is_traditional_down_payment: bool,
    /// Rule table to apply; defaults to the current CMHC table.
    #[serde(default)]
    pub rules: CmhcRuleSet,
}

fn default_true() -> bool {
    true
}

/// Everything the UI renders back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationResult {
    pub loan_amount: Money,
    pub ltv_percent: Percent,
    pub minimum_down_payment: Money,
    /// Total premium rate applied (base plus surcharges).
    pub premium_rate: Rate,
    pub premium_amount: Money,
    /// Loan plus premium; the amount actually amortized.
    pub total_financed: Money,
    pub periodic_payment: Money,
    pub insurance_required: bool,
    pub insurance_eligible: bool,
}

/// Run the full calculation pipeline.
pub fn calculate(
    input: &CalculationInput,
) -> EngineResult<ComputationOutput<CalculationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate(input)?;
    let rules = &input.rules;

    let minimum = down_payment::minimum_down_payment_with(rules, input.purchase_price)?.round_dp(2);
    if input.down_payment < minimum {
        warnings.push(format!(
            "Down payment {} is below the program minimum {} for this price",
            input.down_payment, minimum
        ));
    }

    let loan_amount = input.purchase_price - input.down_payment;

    let breakdown = premium::premium_breakdown(&PremiumInput {
        loan_amount,
        purchase_price: input.purchase_price,
        amortization_years: input.amortization_years,
        is_first_time_buyer: input.is_first_time_buyer,
        is_new_build: input.is_new_build,
        is_traditional_down_payment: input.is_traditional_down_payment,
        rules: rules.clone(),
    })?;

    if breakdown.insurance_required && !breakdown.insurance_eligible {
        warnings.push(format!(
            "Purchase price {} exceeds the {} insurable ceiling; a 20% down payment is required",
            input.purchase_price, rules.insurable_price_ceiling
        ));
    }

    if breakdown.insurance_required && breakdown.insurance_eligible {
        let cap = if input.is_first_time_buyer && input.is_new_build {
            rules.extended_amortization_cap_years
        } else {
            rules.insured_amortization_cap_years
        };
        if input.amortization_years > cap {
            warnings.push(format!(
                "Amortization of {} years exceeds the {cap}-year cap for this insured mortgage",
                input.amortization_years
            ));
        }
    }

    let total_financed = loan_amount + breakdown.premium_amount;
    let periodic = payment::periodic_payment(
        total_financed,
        input.annual_rate_percent,
        input.amortization_years,
        input.frequency,
        input.compounding,
    )?;

    let result = CalculationResult {
        loan_amount: loan_amount.round_dp(2),
        ltv_percent: breakdown.ltv_percent.round_dp(2),
        minimum_down_payment: minimum,
        premium_rate: breakdown.total_rate,
        premium_amount: breakdown.premium_amount,
        total_financed: total_financed.round_dp(2),
        periodic_payment: periodic.round_dp(2),
        insurance_required: breakdown.insurance_required,
        insurance_eligible: breakdown.insurance_eligible,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "CMHC Mortgage Calculation Engine (2025 Rules)",
        input,
        warnings,
        elapsed,
        result,
    ))
}

fn validate(input: &CalculationInput) -> EngineResult<()> {
    if input.purchase_price <= Decimal::ZERO {
        return Err(MortgageEngineError::InvalidInput {
            field: "purchase_price".into(),
            reason: "Purchase price must be positive".into(),
        });
    }
    if input.down_payment < Decimal::ZERO {
        return Err(MortgageEngineError::InvalidInput {
            field: "down_payment".into(),
            reason: "Down payment cannot be negative".into(),
        });
    }
    if input.down_payment >= input.purchase_price {
        return Err(MortgageEngineError::InvalidInput {
            field: "down_payment".into(),
            reason: "Down payment must be less than the purchase price".into(),
        });
    }
    if input.annual_rate_percent < Decimal::ZERO {
        return Err(MortgageEngineError::InvalidInput {
            field: "annual_rate_percent".into(),
            reason: "Rate cannot be negative".into(),
        });
    }
    if input.amortization_years == 0 {
        return Err(MortgageEngineError::InvalidInput {
            field: "amortization_years".into(),
            reason: "Amortization must be at least one year".into(),
        });
    }
    Ok(())
}
