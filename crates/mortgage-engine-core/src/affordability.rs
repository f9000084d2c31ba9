//! Affordability analysis.
//!
//! Applies the federal stress test (qualifying rate = max(contract + 2%,
//! 5.25%)) and the CMHC GDS/TDS debt-service limits, then solves for the
//! maximum purchase price the buyer's income and down payment support under
//! the same down-payment and premium rules the rest of the engine uses.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::down_payment;
use crate::error::MortgageEngineError;
use crate::payment::{self, Compounding};
use crate::premium::{self, PremiumInput};
use crate::rules::CmhcRuleSet;
use crate::types::{with_metadata, ComputationOutput, Money, PaymentFrequency, Percent};
use crate::EngineResult;

/// Gross Debt Service limit: housing costs over gross income.
const GDS_LIMIT: Decimal = dec!(0.39);
/// Total Debt Service limit: housing plus all other debt over gross income.
const TDS_LIMIT: Decimal = dec!(0.44);
/// Stress-test spread over the contract rate, in percent.
const STRESS_SPREAD_PERCENT: Decimal = dec!(2.00);
/// Stress-test floor, in percent.
const QUALIFYING_FLOOR_PERCENT: Decimal = dec!(5.25);
/// Half of condo fees count toward debt service.
const CONDO_FEE_FACTOR: Decimal = dec!(0.5);

/// Price-search resolution in dollars.
const PRICE_SEARCH_TOLERANCE: Decimal = dec!(1);
const MAX_SEARCH_ITERATIONS: u32 = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordabilityInput {
    pub gross_annual_income: Money,
    /// Non-housing debt payments per month (loans, cards, support).
    #[serde(default)]
    pub monthly_debt_payments: Money,
    #[serde(default)]
    pub monthly_heating: Money,
    #[serde(default)]
    pub monthly_property_tax: Money,
    #[serde(default)]
    pub monthly_condo_fees: Money,
    /// Cash available for the down payment.
    pub down_payment_available: Money,
    /// Contract rate in percent.
    pub annual_rate_percent: Percent,
    pub amortization_years: u32,
    #[serde(default)]
    pub compounding: Compounding,
    #[serde(default)]
    pub is_first_time_buyer: bool,
    #[serde(default)]
    pub is_new_build: bool,
    #[serde(default)]
    pub rules: CmhcRuleSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordabilityOutput {
    /// Rate the buyer must qualify at, in percent.
    pub qualifying_rate_percent: Percent,
    /// Monthly payment ceiling from the GDS limit.
    pub gds_payment_cap: Money,
    /// Monthly payment ceiling from the TDS limit.
    pub tds_payment_cap: Money,
    /// Binding monthly payment ceiling (smaller of the two).
    pub max_monthly_payment: Money,
    /// Largest purchase price consistent with the caps, the buyer's down
    /// payment, and the down-payment/premium rules.
    pub max_purchase_price: Money,
}

/// Rate the borrower must qualify at for a given contract rate.
pub fn qualifying_rate(contract_rate_percent: Percent) -> Percent {
    let stressed = contract_rate_percent + STRESS_SPREAD_PERCENT;
    stressed.max(QUALIFYING_FLOOR_PERCENT)
}

/// Run the affordability analysis.
pub fn analyze_affordability(
    input: &AffordabilityInput,
) -> EngineResult<ComputationOutput<AffordabilityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    validate(input)?;

    let qualify_at = qualifying_rate(input.annual_rate_percent);
    let monthly_income = input.gross_annual_income / dec!(12);
    let housing_overhead = input.monthly_heating
        + input.monthly_property_tax
        + input.monthly_condo_fees * CONDO_FEE_FACTOR;

    let gds_cap = monthly_income * GDS_LIMIT - housing_overhead;
    let tds_cap = monthly_income * TDS_LIMIT - housing_overhead - input.monthly_debt_payments;
    let max_payment = gds_cap.min(tds_cap);

    let max_price = if max_payment <= Decimal::ZERO {
        warnings.push(
            "Existing obligations exceed the debt-service limits; no mortgage is supportable"
                .to_string(),
        );
        Decimal::ZERO
    } else {
        search_max_price(input, qualify_at, max_payment)?
    };

    let output = AffordabilityOutput {
        qualifying_rate_percent: qualify_at,
        gds_payment_cap: gds_cap.round_dp(2),
        tds_payment_cap: tds_cap.round_dp(2),
        max_monthly_payment: max_payment.max(Decimal::ZERO).round_dp(2),
        max_purchase_price: max_price,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "GDS/TDS Limits with Federal Stress Test",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Monthly payment required at a candidate price, or None when the price is
/// not financeable with the buyer's down payment (below program minimum,
/// above the insurable ceiling at high ratio, or LTV above the maximum).
fn required_payment(
    input: &AffordabilityInput,
    qualify_at: Percent,
    price: Money,
) -> EngineResult<Option<Money>> {
    let down = input.down_payment_available;
    if price <= down {
        return Ok(Some(Decimal::ZERO));
    }

    let minimum = down_payment::minimum_down_payment_with(&input.rules, price)?;
    if down < minimum {
        return Ok(None);
    }

    let breakdown = premium::premium_breakdown(&PremiumInput {
        loan_amount: price - down,
        purchase_price: price,
        amortization_years: input.amortization_years,
        is_first_time_buyer: input.is_first_time_buyer,
        is_new_build: input.is_new_build,
        is_traditional_down_payment: true,
        rules: input.rules.clone(),
    })?;
    if breakdown.insurance_required && !breakdown.insurance_eligible {
        return Ok(None);
    }

    let total_financed = price - down + breakdown.premium_amount;
    let payment = payment::periodic_payment(
        total_financed,
        qualify_at,
        input.amortization_years,
        PaymentFrequency::Monthly,
        input.compounding,
    )?;
    Ok(Some(payment))
}

fn search_max_price(
    input: &AffordabilityInput,
    qualify_at: Percent,
    max_payment: Money,
) -> EngineResult<Money> {
    let affordable = |price: Money| -> EngineResult<bool> {
        Ok(match required_payment(input, qualify_at, price)? {
            Some(payment) => payment <= max_payment,
            None => false,
        })
    };

    // Grow an upper bound until infeasible, then bisect. Feasibility is
    // monotone in price: payment rises with price and the down-payment
    // minimum only tightens.
    let mut lo = input.down_payment_available.max(Decimal::ONE);
    if !affordable(lo)? {
        return Ok(Decimal::ZERO);
    }
    let mut hi = lo * dec!(2) + dec!(100_000);
    let mut growth = 0;
    while affordable(hi)? {
        lo = hi;
        hi *= dec!(2);
        growth += 1;
        if growth > 40 {
            // Unbounded in practice only with a zero qualifying rate and no
            // caps; clamp rather than loop forever.
            return Ok(hi.floor());
        }
    }

    let mut iterations = 0;
    while hi - lo > PRICE_SEARCH_TOLERANCE && iterations < MAX_SEARCH_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        if affordable(mid)? {
            lo = mid;
        } else {
            hi = mid;
        }
        iterations += 1;
    }

    Ok(lo.floor())
}

fn validate(input: &AffordabilityInput) -> EngineResult<()> {
    input.rules.validate()?;
    if input.gross_annual_income <= Decimal::ZERO {
        return Err(MortgageEngineError::InvalidInput {
            field: "gross_annual_income".into(),
            reason: "Income must be positive".into(),
        });
    }
    if input.down_payment_available < Decimal::ZERO {
        return Err(MortgageEngineError::InvalidInput {
            field: "down_payment_available".into(),
            reason: "Down payment cannot be negative".into(),
        });
    }
    if input.monthly_debt_payments < Decimal::ZERO
        || input.monthly_heating < Decimal::ZERO
        || input.monthly_property_tax < Decimal::ZERO
        || input.monthly_condo_fees < Decimal::ZERO
    {
        return Err(MortgageEngineError::InvalidInput {
            field: "monthly_obligations".into(),
            reason: "Monthly obligations cannot be negative".into(),
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
