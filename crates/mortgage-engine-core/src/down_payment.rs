//! Minimum down payment rule.
//!
//! Tiered schedule: 5% up to $500K, 10% on the portion between $500K and
//! $1.5M, and a flat 20% of the full price above $1.5M (where default
//! insurance is unavailable). Continuous at the $500K boundary by
//! construction; discontinuous at $1.5M where eligibility itself changes.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::MortgageEngineError;
use crate::rules::{CmhcRuleSet, TierBasis};
use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::EngineResult;

/// Input for the down-payment analysis operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownPaymentInput {
    /// Purchase price of the property.
    pub purchase_price: Money,
    /// Rule table to apply; defaults to the current CMHC table.
    #[serde(default)]
    pub rules: CmhcRuleSet,
}

/// Per-tier contribution to the minimum down payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierContribution {
    /// Portion of the price the tier's rate applied to.
    pub applied_to: Money,
    /// The tier's rate.
    pub rate: Decimal,
    /// Amount contributed by this tier.
    pub amount: Money,
}

/// Output of the down-payment analysis operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownPaymentOutput {
    /// Minimum down payment in dollars, rounded to cents.
    pub minimum_down_payment: Money,
    /// Minimum down payment as a percent of price.
    pub minimum_percent_of_price: Percent,
    /// Maximum insurable loan at the minimum down payment.
    pub maximum_loan_amount: Money,
    /// How each tier contributed.
    pub tier_breakdown: Vec<TierContribution>,
}

/// Minimum down payment under the current CMHC table.
pub fn minimum_down_payment(price: Money) -> EngineResult<Money> {
    minimum_down_payment_with(&CmhcRuleSet::cmhc_2025(), price)
}

/// Minimum down payment under an explicit rule table.
pub fn minimum_down_payment_with(rules: &CmhcRuleSet, price: Money) -> EngineResult<Money> {
    Ok(tier_contributions(rules, price)?
        .iter()
        .map(|c| c.amount)
        .sum())
}

/// Full down-payment analysis: tier breakdown, effective percent, and
/// maximum loan.
pub fn analyze_down_payment(
    input: &DownPaymentInput,
) -> EngineResult<ComputationOutput<DownPaymentOutput>> {
    let start = Instant::now();
    input.rules.validate()?;

    let breakdown = tier_contributions(&input.rules, input.purchase_price)?;
    let minimum: Money = breakdown.iter().map(|c| c.amount).sum();
    let minimum = minimum.round_dp(2);

    let minimum_percent = if input.purchase_price.is_zero() {
        Decimal::ZERO
    } else {
        (minimum / input.purchase_price * dec!(100)).round_dp(4)
    };

    let output = DownPaymentOutput {
        minimum_down_payment: minimum,
        minimum_percent_of_price: minimum_percent,
        maximum_loan_amount: (input.purchase_price - minimum).round_dp(2),
        tier_breakdown: breakdown,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "CMHC Minimum Down Payment Tiering",
        input,
        Vec::new(),
        elapsed,
        output,
    ))
}

fn tier_contributions(rules: &CmhcRuleSet, price: Money) -> EngineResult<Vec<TierContribution>> {
    if price < Decimal::ZERO {
        return Err(MortgageEngineError::InvalidInput {
            field: "purchase_price".into(),
            reason: "Purchase price cannot be negative".into(),
        });
    }

    let mut contributions = Vec::new();
    let mut prev_bound = Decimal::ZERO;

    for tier in &rules.down_payment_tiers {
        let in_tier = match tier.upper_bound {
            Some(bound) => price <= bound,
            None => true,
        };

        match tier.basis {
            TierBasis::FullPrice if in_tier => {
                // Flat-rate band: the whole price, not the marginal slice.
                contributions.clear();
                contributions.push(TierContribution {
                    applied_to: price,
                    rate: tier.rate,
                    amount: price * tier.rate,
                });
                return Ok(contributions);
            }
            TierBasis::FullPrice => {}
            TierBasis::Marginal => {
                let slice_top = match tier.upper_bound {
                    Some(bound) => price.min(bound),
                    None => price,
                };
                if slice_top > prev_bound {
                    let slice = slice_top - prev_bound;
                    contributions.push(TierContribution {
                        applied_to: slice,
                        rate: tier.rate,
                        amount: slice * tier.rate,
                    });
                }
                if in_tier {
                    return Ok(contributions);
                }
            }
        }

        if let Some(bound) = tier.upper_bound {
            prev_bound = bound;
        }
    }

    Ok(contributions)
}
