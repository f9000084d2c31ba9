//! Mortgage default insurance premium rule (CMHC 2025).
//!
//! Base rate comes from the LTV bracket table, first match wins in ascending
//! order. Surcharges are additive on top of the base rate and only exist for
//! high-ratio loans (LTV > 80%). "No insurance required" (LTV <= 80%) and
//! "not eligible for insurance" (price above the insurable ceiling) both
//! price at zero but are distinct outcomes, surfaced through separate flags.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::MortgageEngineError;
use crate::rules::CmhcRuleSet;
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Rate};
use crate::EngineResult;

/// Input for the premium calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PremiumInput {
    /// Loan amount before the premium is added.
    pub loan_amount: Money,
    /// Purchase price of the property.
    pub purchase_price: Money,
    /// Scheduled amortization in years.
    pub amortization_years: u32,
    /// Whether any borrower qualifies as a first-time buyer.
    #[serde(default)]
    pub is_first_time_buyer: bool,
    /// Whether the property is new construction.
    #[serde(default)]
    pub is_new_build: bool,
    /// Whether the down payment came from savings/gift/equity rather than
    /// borrowed funds. Only changes the rate in the top LTV bracket.
    #[serde(default = "default_true")]
    pub is_traditional_down_payment: bool,
    /// Rule table to apply; defaults to the current CMHC table.
    #[serde(default)]
    pub rules: CmhcRuleSet,
}

fn default_true() -> bool {
    true
}

/// Full premium breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PremiumBreakdown {
    /// Loan-to-value, in percent.
    pub ltv_percent: Percent,
    /// Base rate from the LTV bracket table (zero when uninsured/ineligible).
    pub base_rate: Rate,
    /// Extended-amortization surcharge applied, if any.
    pub amortization_surcharge: Rate,
    /// First-time-buyer new-build 30-year surcharge applied, if any.
    pub first_time_new_build_surcharge: Rate,
    /// $1M–$1.5M high-ratio price surcharge applied, if any.
    pub high_price_surcharge: Rate,
    /// Sum of base rate and surcharges.
    pub total_rate: Rate,
    /// Premium in dollars, rounded to cents.
    pub premium_amount: Money,
    /// True when LTV > 80% (insurance is mandatory if available).
    pub insurance_required: bool,
    /// False only when the loan needs insurance but the price is above the
    /// insurable ceiling.
    pub insurance_eligible: bool,
}

/// Premium amount under the current CMHC table. Matches the breakdown's
/// `premium_amount` field.
pub fn premium(
    loan_amount: Money,
    purchase_price: Money,
    amortization_years: u32,
    is_first_time_buyer: bool,
    is_new_build: bool,
    is_traditional_down_payment: bool,
) -> EngineResult<Money> {
    let input = PremiumInput {
        loan_amount,
        purchase_price,
        amortization_years,
        is_first_time_buyer,
        is_new_build,
        is_traditional_down_payment,
        rules: CmhcRuleSet::cmhc_2025(),
    };
    Ok(premium_breakdown(&input)?.premium_amount)
}

/// Compute the full premium breakdown.
pub fn premium_breakdown(input: &PremiumInput) -> EngineResult<PremiumBreakdown> {
    validate(input)?;
    let rules = &input.rules;

    let ltv_percent = input.loan_amount / input.purchase_price * dec!(100);

    let zero_breakdown = |required: bool, eligible: bool| PremiumBreakdown {
        ltv_percent,
        base_rate: Decimal::ZERO,
        amortization_surcharge: Decimal::ZERO,
        first_time_new_build_surcharge: Decimal::ZERO,
        high_price_surcharge: Decimal::ZERO,
        total_rate: Decimal::ZERO,
        premium_amount: Decimal::ZERO,
        insurance_required: required,
        insurance_eligible: eligible,
    };

    // Conventional loan: no insurance needed.
    if ltv_percent <= rules.conventional_ltv_percent {
        return Ok(zero_breakdown(false, true));
    }

    // High-ratio but above the insurable price ceiling: a valid outcome the
    // caller must surface, not an error.
    if input.purchase_price > rules.insurable_price_ceiling {
        return Ok(zero_breakdown(true, false));
    }

    if ltv_percent > rules.max_insurable_ltv_percent {
        return Err(MortgageEngineError::InvalidInput {
            field: "loan_amount".into(),
            reason: format!(
                "LTV {:.2}% exceeds the {}% insurable maximum (down payment below legal minimum)",
                ltv_percent, rules.max_insurable_ltv_percent
            ),
        });
    }

    // bracket_for_ltv cannot miss here: ltv <= max insurable, which validate()
    // pins to the top bracket bound.
    let bracket = rules.bracket_for_ltv(ltv_percent).ok_or_else(|| {
        MortgageEngineError::InvalidRuleSet(format!("no LTV bracket covers {ltv_percent}%"))
    })?;
    let base_rate = if input.is_traditional_down_payment {
        bracket.traditional_rate
    } else {
        bracket.non_traditional_rate
    };

    let sc = &rules.surcharges;
    let mut amortization_surcharge = Decimal::ZERO;
    let mut first_time_new_build_surcharge = Decimal::ZERO;
    if input.amortization_years > sc.extended_amortization_threshold_years {
        amortization_surcharge = sc.extended_amortization_rate;
        if input.is_first_time_buyer
            && input.is_new_build
            && input.amortization_years == sc.first_time_new_build_years
        {
            first_time_new_build_surcharge = sc.first_time_new_build_rate;
        }
    }

    let high_price_surcharge = if input.purchase_price >= sc.high_price_floor
        && input.purchase_price <= sc.high_price_ceiling
    {
        sc.high_price_rate
    } else {
        Decimal::ZERO
    };

    let total_rate =
        base_rate + amortization_surcharge + first_time_new_build_surcharge + high_price_surcharge;

    Ok(PremiumBreakdown {
        ltv_percent,
        base_rate,
        amortization_surcharge,
        first_time_new_build_surcharge,
        high_price_surcharge,
        total_rate,
        premium_amount: (input.loan_amount * total_rate).round_dp(2),
        insurance_required: true,
        insurance_eligible: true,
    })
}

/// Premium analysis with the standard output envelope.
pub fn analyze_premium(
    input: &PremiumInput,
) -> EngineResult<ComputationOutput<PremiumBreakdown>> {
    let start = Instant::now();
    let breakdown = premium_breakdown(input)?;

    let mut warnings: Vec<String> = Vec::new();
    if breakdown.insurance_required && !breakdown.insurance_eligible {
        warnings.push(format!(
            "Purchase price {} exceeds the {} insurable ceiling; a 20% down payment is required",
            input.purchase_price, input.rules.insurable_price_ceiling
        ));
    }
    if breakdown.insurance_eligible
        && breakdown.insurance_required
        && input.amortization_years > input.rules.extended_amortization_cap_years
    {
        warnings.push(format!(
            "Amortization of {} years exceeds the {}-year cap for insured mortgages",
            input.amortization_years, input.rules.extended_amortization_cap_years
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "CMHC 2025 Premium Rate Table with Surcharges",
        input,
        warnings,
        elapsed,
        breakdown,
    ))
}

fn validate(input: &PremiumInput) -> EngineResult<()> {
    input.rules.validate()?;
    if input.purchase_price <= Decimal::ZERO {
        return Err(MortgageEngineError::InvalidInput {
            field: "purchase_price".into(),
            reason: "Purchase price must be positive".into(),
        });
    }
    if input.loan_amount < Decimal::ZERO {
        return Err(MortgageEngineError::InvalidInput {
            field: "loan_amount".into(),
            reason: "Loan amount cannot be negative".into(),
        });
    }
    if input.loan_amount > input.purchase_price {
        return Err(MortgageEngineError::InvalidInput {
            field: "loan_amount".into(),
            reason: "Loan amount cannot exceed purchase price".into(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn standard_input(loan: Decimal, price: Decimal) -> PremiumInput {
        PremiumInput {
            loan_amount: loan,
            purchase_price: price,
            amortization_years: 25,
            is_first_time_buyer: false,
            is_new_build: false,
            is_traditional_down_payment: true,
            rules: CmhcRuleSet::cmhc_2025(),
        }
    }

    // -----------------------------------------------------------------------
    // 1. LTV <= 80%: no insurance required, premium zero
    // -----------------------------------------------------------------------
    #[test]
    fn test_conventional_80_percent_boundary_exempt() {
        // price 750k, down 150k: LTV exactly 80%
        let out = premium_breakdown(&standard_input(dec!(600_000), dec!(750_000))).unwrap();
        assert_eq!(out.ltv_percent, dec!(80));
        assert_eq!(out.premium_amount, Decimal::ZERO);
        assert!(!out.insurance_required);
        assert!(out.insurance_eligible);
    }

    #[test]
    fn test_just_above_80_percent_is_insured() {
        let out = premium_breakdown(&standard_input(dec!(600_001), dec!(750_000))).unwrap();
        assert!(out.insurance_required);
        assert_eq!(out.base_rate, dec!(0.0280));
    }

    // -----------------------------------------------------------------------
    // 2. 95% LTV traditional: published CMHC example
    // -----------------------------------------------------------------------
    #[test]
    fn test_95_ltv_traditional_known_value() {
        let out = premium_breakdown(&standard_input(dec!(475_000), dec!(500_000))).unwrap();
        assert_eq!(out.ltv_percent, dec!(95));
        assert_eq!(out.base_rate, dec!(0.0400));
        assert_eq!(out.total_rate, dec!(0.0400));
        assert_eq!(out.premium_amount, dec!(19_000));
    }

    #[test]
    fn test_premium_convenience_wrapper() {
        let amount = premium(dec!(475_000), dec!(500_000), 25, false, false, true).unwrap();
        assert_eq!(amount, dec!(19_000));
    }

    #[test]
    fn test_95_ltv_non_traditional_rate() {
        let mut input = standard_input(dec!(475_000), dec!(500_000));
        input.is_traditional_down_payment = false;
        let out = premium_breakdown(&input).unwrap();
        assert_eq!(out.base_rate, dec!(0.0450));
        assert_eq!(out.premium_amount, dec!(21_375));
    }

    #[test]
    fn test_down_payment_source_irrelevant_below_90() {
        let mut input = standard_input(dec!(425_000), dec!(500_000)); // LTV 85
        input.is_traditional_down_payment = false;
        let out = premium_breakdown(&input).unwrap();
        assert_eq!(out.base_rate, dec!(0.0280));
    }

    // -----------------------------------------------------------------------
    // 3. Full surcharge stack: $1.2M FTB new-build at 30 years
    // -----------------------------------------------------------------------
    #[test]
    fn test_full_surcharge_stack_known_value() {
        let input = PremiumInput {
            loan_amount: dec!(1_080_000),
            purchase_price: dec!(1_200_000),
            amortization_years: 30,
            is_first_time_buyer: true,
            is_new_build: true,
            is_traditional_down_payment: true,
            rules: CmhcRuleSet::cmhc_2025(),
        };
        let out = premium_breakdown(&input).unwrap();
        assert_eq!(out.ltv_percent, dec!(90));
        assert_eq!(out.base_rate, dec!(0.0310));
        assert_eq!(out.amortization_surcharge, dec!(0.0025));
        assert_eq!(out.first_time_new_build_surcharge, dec!(0.0020));
        assert_eq!(out.high_price_surcharge, dec!(0.0025));
        assert_eq!(out.total_rate, dec!(0.0380));
        assert_eq!(out.premium_amount, dec!(41_040));
    }

    #[test]
    fn test_amortization_surcharge_without_ftb() {
        let mut input = standard_input(dec!(450_000), dec!(500_000)); // LTV 90
        input.amortization_years = 30;
        let out = premium_breakdown(&input).unwrap();
        assert_eq!(out.amortization_surcharge, dec!(0.0025));
        assert_eq!(out.first_time_new_build_surcharge, Decimal::ZERO);
        assert_eq!(out.total_rate, dec!(0.0335));
    }

    #[test]
    fn test_ftb_new_build_surcharge_requires_30_years() {
        let mut input = standard_input(dec!(450_000), dec!(500_000));
        input.amortization_years = 28;
        input.is_first_time_buyer = true;
        input.is_new_build = true;
        let out = premium_breakdown(&input).unwrap();
        assert_eq!(out.amortization_surcharge, dec!(0.0025));
        assert_eq!(out.first_time_new_build_surcharge, Decimal::ZERO);
    }

    #[test]
    fn test_high_price_surcharge_at_exactly_one_million() {
        let input = PremiumInput {
            loan_amount: dec!(900_000),
            purchase_price: dec!(1_000_000),
            amortization_years: 25,
            is_first_time_buyer: false,
            is_new_build: false,
            is_traditional_down_payment: true,
            rules: CmhcRuleSet::cmhc_2025(),
        };
        let out = premium_breakdown(&input).unwrap();
        assert_eq!(out.high_price_surcharge, dec!(0.0025));
        assert_eq!(out.total_rate, dec!(0.0335));
    }

    #[test]
    fn test_no_high_price_surcharge_below_one_million() {
        let out = premium_breakdown(&standard_input(dec!(899_999), dec!(999_999))).unwrap();
        assert_eq!(out.high_price_surcharge, Decimal::ZERO);
    }

    // -----------------------------------------------------------------------
    // 4. Ineligibility above the price ceiling
    // -----------------------------------------------------------------------
    #[test]
    fn test_above_ceiling_is_ineligible_not_error() {
        let out = premium_breakdown(&standard_input(dec!(1_400_000), dec!(1_600_000))).unwrap();
        assert_eq!(out.premium_amount, Decimal::ZERO);
        assert!(out.insurance_required);
        assert!(!out.insurance_eligible);
    }

    #[test]
    fn test_above_ceiling_with_extreme_ltv_still_zero() {
        // The ceiling check wins regardless of how high the LTV is.
        let out = premium_breakdown(&standard_input(dec!(1_568_000), dec!(1_600_000))).unwrap();
        assert_eq!(out.premium_amount, Decimal::ZERO);
        assert!(!out.insurance_eligible);
    }

    #[test]
    fn test_ineligible_warning_emitted() {
        let env = analyze_premium(&standard_input(dec!(1_400_000), dec!(1_600_000))).unwrap();
        assert!(!env.warnings.is_empty());
        assert!(env.warnings[0].contains("insurable ceiling"));
    }

    // -----------------------------------------------------------------------
    // 5. Invalid inputs
    // -----------------------------------------------------------------------
    #[test]
    fn test_ltv_above_95_rejected() {
        let err = premium_breakdown(&standard_input(dec!(480_000), dec!(500_000))).unwrap_err();
        assert!(matches!(err, MortgageEngineError::InvalidInput { .. }));
    }

    #[test]
    fn test_zero_price_rejected() {
        let err = premium_breakdown(&standard_input(dec!(100), Decimal::ZERO)).unwrap_err();
        assert!(matches!(
            err,
            MortgageEngineError::InvalidInput { ref field, .. } if field == "purchase_price"
        ));
    }

    #[test]
    fn test_loan_above_price_rejected() {
        let err = premium_breakdown(&standard_input(dec!(600_000), dec!(500_000))).unwrap_err();
        assert!(matches!(err, MortgageEngineError::InvalidInput { .. }));
    }

    #[test]
    fn test_zero_amortization_rejected() {
        let mut input = standard_input(dec!(450_000), dec!(500_000));
        input.amortization_years = 0;
        assert!(premium_breakdown(&input).is_err());
    }

    // -----------------------------------------------------------------------
    // 6. Monotonicity in down payment
    // -----------------------------------------------------------------------
    #[test]
    fn test_premium_monotone_in_down_payment() {
        let price = dec!(600_000);
        let mut last = Decimal::MAX;
        for down_pct in [5u32, 10, 15, 20, 25] {
            let down = price * Decimal::from(down_pct) / dec!(100);
            let out = premium_breakdown(&standard_input(price - down, price)).unwrap();
            assert!(
                out.premium_amount <= last,
                "premium rose as down payment increased at {down_pct}%"
            );
            last = out.premium_amount;
        }
    }

    // -----------------------------------------------------------------------
    // 7. Idempotence
    // -----------------------------------------------------------------------
    #[test]
    fn test_identical_inputs_identical_outputs() {
        let input = standard_input(dec!(475_000), dec!(500_000));
        let a = premium_breakdown(&input).unwrap();
        let b = premium_breakdown(&input).unwrap();
        assert_eq!(a.premium_amount, b.premium_amount);
        assert_eq!(a.total_rate, b.total_rate);
        assert_eq!(a.ltv_percent, b.ltv_percent);
    }
}
