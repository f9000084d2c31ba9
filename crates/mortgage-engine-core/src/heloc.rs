//! Home equity line of credit limits.
//!
//! Federal limits: a revolving HELOC may not exceed 65% of the property
//! value, and HELOC plus outstanding mortgage may not exceed 80% combined
//! LTV. The available line is whichever bound binds first.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::MortgageEngineError;
use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::EngineResult;

/// Revolving-portion LTV limit.
const HELOC_LTV_LIMIT: Decimal = dec!(0.65);
/// Combined mortgage-plus-HELOC LTV limit.
const COMBINED_LTV_LIMIT: Decimal = dec!(0.80);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelocInput {
    /// Current appraised property value.
    pub property_value: Money,
    /// Outstanding mortgage balance.
    #[serde(default)]
    pub mortgage_balance: Money,
    /// HELOC interest rate in percent, for the interest-only cost estimate.
    pub annual_rate_percent: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelocOutput {
    /// Value minus mortgage balance (may be negative when underwater).
    pub home_equity: Money,
    /// Largest HELOC the 65%/80% limits allow.
    pub available_credit_limit: Money,
    /// Combined LTV if the full line were drawn, in percent.
    pub combined_ltv_percent: Percent,
    /// Monthly interest-only cost on the full line.
    pub interest_only_monthly_payment: Money,
}

/// Compute the available HELOC limit and its carrying cost.
pub fn analyze_heloc(input: &HelocInput) -> EngineResult<ComputationOutput<HelocOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    validate(input)?;

    let standalone_cap = input.property_value * HELOC_LTV_LIMIT;
    let combined_room = input.property_value * COMBINED_LTV_LIMIT - input.mortgage_balance;
    let available = standalone_cap.min(combined_room).max(Decimal::ZERO);

    if available.is_zero() {
        warnings.push(format!(
            "Mortgage balance {} leaves no room under the {}% combined LTV limit",
            input.mortgage_balance,
            COMBINED_LTV_LIMIT * dec!(100)
        ));
    }

    let combined_ltv = (input.mortgage_balance + available) / input.property_value * dec!(100);
    let monthly_interest = available * input.annual_rate_percent / dec!(100) / dec!(12);

    let output = HelocOutput {
        home_equity: (input.property_value - input.mortgage_balance).round_dp(2),
        available_credit_limit: available.round_dp(2),
        combined_ltv_percent: combined_ltv.round_dp(2),
        interest_only_monthly_payment: monthly_interest.round_dp(2),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "HELOC 65%/80% LTV Limits",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn validate(input: &HelocInput) -> EngineResult<()> {
    if input.property_value <= Decimal::ZERO {
        return Err(MortgageEngineError::InvalidInput {
            field: "property_value".into(),
            reason: "Property value must be positive".into(),
        });
    }
    if input.mortgage_balance < Decimal::ZERO {
        return Err(MortgageEngineError::InvalidInput {
            field: "mortgage_balance".into(),
            reason: "Mortgage balance cannot be negative".into(),
        });
    }
    if input.annual_rate_percent < Decimal::ZERO {
        return Err(MortgageEngineError::InvalidInput {
            field: "annual_rate_percent".into(),
            reason: "Rate cannot be negative".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn standard_input() -> HelocInput {
        HelocInput {
            property_value: dec!(1_000_000),
            mortgage_balance: dec!(500_000),
            annual_rate_percent: dec!(7.20),
        }
    }

    #[test]
    fn test_combined_limit_binds() {
        let out = analyze_heloc(&standard_input()).unwrap().result;
        // 80% of 1M is 800k; 500k outstanding leaves 300k, under the 650k cap.
        assert_eq!(out.available_credit_limit, dec!(300_000));
        assert_eq!(out.combined_ltv_percent, dec!(80));
        assert_eq!(out.home_equity, dec!(500_000));
    }

    #[test]
    fn test_standalone_limit_binds() {
        let mut input = standard_input();
        input.mortgage_balance = dec!(100_000);
        let out = analyze_heloc(&input).unwrap().result;
        assert_eq!(out.available_credit_limit, dec!(650_000));
        assert_eq!(out.combined_ltv_percent, dec!(75));
    }

    #[test]
    fn test_interest_only_cost() {
        let out = analyze_heloc(&standard_input()).unwrap().result;
        // 300,000 * 7.2% / 12
        assert_eq!(out.interest_only_monthly_payment, dec!(1800));
    }

    #[test]
    fn test_no_room_warns() {
        let mut input = standard_input();
        input.mortgage_balance = dec!(900_000);
        let out = analyze_heloc(&input).unwrap();
        assert_eq!(out.result.available_credit_limit, Decimal::ZERO);
        assert!(!out.warnings.is_empty());
    }

    #[test]
    fn test_underwater_equity_is_negative() {
        let mut input = standard_input();
        input.mortgage_balance = dec!(1_100_000);
        let out = analyze_heloc(&input).unwrap().result;
        assert_eq!(out.home_equity, dec!(-100_000));
        assert_eq!(out.available_credit_limit, Decimal::ZERO);
    }

    #[test]
    fn test_invalid_property_value() {
        let mut input = standard_input();
        input.property_value = Decimal::ZERO;
        assert!(analyze_heloc(&input).is_err());
    }
}
