//! Versioned CMHC rule tables.
//!
//! Premium rates, down-payment tiers, and eligibility thresholds change by
//! regulatory announcement, not by code release, so they live in a single
//! serde-serializable `CmhcRuleSet` that the calculation functions take as
//! input. `CmhcRuleSet::cmhc_2025()` is the authoritative current table.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::MortgageEngineError;
use crate::types::{Money, Percent, Rate};
use crate::EngineResult;

/// One band of the minimum-down-payment schedule.
///
/// `Marginal` tiers apply their rate only to the slice of price above the
/// previous tier's bound; `FullPrice` tiers apply it to the entire price.
/// The >$1.5M band is `FullPrice`, which is why minimum down payment jumps
/// discontinuously at that boundary (insurance eligibility ends there too).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierBasis {
    Marginal,
    FullPrice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownPaymentTier {
    /// Inclusive upper bound of the band; `None` for the open-ended top band.
    pub upper_bound: Option<Money>,
    /// Minimum down payment rate for this band (0.05 = 5%).
    pub rate: Rate,
    pub basis: TierBasis,
}

/// One row of the premium-rate table, keyed by LTV upper bound.
///
/// Scanned in ascending order, first match wins; an LTV exactly on a bound
/// belongs to the lower-rate bracket. The down-payment source only changes
/// the rate in the top (90–95%) bracket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LtvBracket {
    /// Inclusive LTV upper bound, in percent (e.g. 85 for "up to 85%").
    pub max_ltv_percent: Percent,
    /// Premium rate for down payments from savings, gifts, or equity.
    pub traditional_rate: Rate,
    /// Premium rate for borrowed down payments.
    pub non_traditional_rate: Rate,
}

/// Additive premium-rate surcharges. Each applies only when its trigger
/// holds together with LTV > 80% (conventional loans never reach the
/// premium calculation with a nonzero rate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurchargeSchedule {
    /// Added when amortization exceeds `extended_amortization_threshold_years`.
    pub extended_amortization_rate: Rate,
    pub extended_amortization_threshold_years: u32,
    /// Added on top for first-time buyers purchasing new construction at
    /// exactly `first_time_new_build_years` of amortization.
    pub first_time_new_build_rate: Rate,
    pub first_time_new_build_years: u32,
    /// Added when price falls in [`high_price_floor`, `high_price_ceiling`].
    pub high_price_rate: Rate,
    pub high_price_floor: Money,
    pub high_price_ceiling: Money,
}

/// A complete, versioned CMHC rule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmhcRuleSet {
    /// Human-readable version tag (e.g. "cmhc-2025").
    pub version: String,
    /// Date the table took regulatory effect.
    pub effective: NaiveDate,
    pub down_payment_tiers: Vec<DownPaymentTier>,
    pub ltv_brackets: Vec<LtvBracket>,
    pub surcharges: SurchargeSchedule,
    /// Prices above this are not insurable regardless of LTV.
    pub insurable_price_ceiling: Money,
    /// LTV at or below this needs no insurance.
    pub conventional_ltv_percent: Percent,
    /// LTV above this is not insurable (down payment below legal minimum).
    pub max_insurable_ltv_percent: Percent,
    /// Standard amortization cap for insured mortgages, in years.
    pub insured_amortization_cap_years: u32,
    /// Extended cap for first-time buyers purchasing new construction.
    pub extended_amortization_cap_years: u32,
}

impl CmhcRuleSet {
    /// The 2025 official rules, including the December 2024 expansion of the
    /// insurable price ceiling to $1.5M and the 30-year amortization
    /// surcharges.
    pub fn cmhc_2025() -> Self {
        CmhcRuleSet {
            version: "cmhc-2025".to_string(),
            effective: NaiveDate::from_ymd_opt(2024, 12, 15).unwrap_or_default(),
            down_payment_tiers: vec![
                DownPaymentTier {
                    upper_bound: Some(dec!(500_000)),
                    rate: dec!(0.05),
                    basis: TierBasis::Marginal,
                },
                DownPaymentTier {
                    upper_bound: Some(dec!(1_500_000)),
                    rate: dec!(0.10),
                    basis: TierBasis::Marginal,
                },
                DownPaymentTier {
                    upper_bound: None,
                    rate: dec!(0.20),
                    basis: TierBasis::FullPrice,
                },
            ],
            ltv_brackets: vec![
                LtvBracket {
                    max_ltv_percent: dec!(65),
                    traditional_rate: dec!(0.0060),
                    non_traditional_rate: dec!(0.0060),
                },
                LtvBracket {
                    max_ltv_percent: dec!(75),
                    traditional_rate: dec!(0.0170),
                    non_traditional_rate: dec!(0.0170),
                },
                LtvBracket {
                    max_ltv_percent: dec!(80),
                    traditional_rate: dec!(0.0240),
                    non_traditional_rate: dec!(0.0240),
                },
                LtvBracket {
                    max_ltv_percent: dec!(85),
                    traditional_rate: dec!(0.0280),
                    non_traditional_rate: dec!(0.0280),
                },
                LtvBracket {
                    max_ltv_percent: dec!(90),
                    traditional_rate: dec!(0.0310),
                    non_traditional_rate: dec!(0.0310),
                },
                LtvBracket {
                    max_ltv_percent: dec!(95),
                    traditional_rate: dec!(0.0400),
                    non_traditional_rate: dec!(0.0450),
                },
            ],
            surcharges: SurchargeSchedule {
                extended_amortization_rate: dec!(0.0025),
                extended_amortization_threshold_years: 25,
                first_time_new_build_rate: dec!(0.0020),
                first_time_new_build_years: 30,
                high_price_rate: dec!(0.0025),
                high_price_floor: dec!(1_000_000),
                high_price_ceiling: dec!(1_500_000),
            },
            insurable_price_ceiling: dec!(1_500_000),
            conventional_ltv_percent: dec!(80),
            max_insurable_ltv_percent: dec!(95),
            insured_amortization_cap_years: 25,
            extended_amortization_cap_years: 30,
        }
    }

    /// Find the premium-rate bracket for an LTV, ascending scan, first match
    /// wins. Returns `None` when the LTV exceeds every bracket bound.
    pub fn bracket_for_ltv(&self, ltv_percent: Percent) -> Option<&LtvBracket> {
        self.ltv_brackets
            .iter()
            .find(|b| ltv_percent <= b.max_ltv_percent)
    }

    /// Check structural invariants of the table.
    pub fn validate(&self) -> EngineResult<()> {
        if self.down_payment_tiers.is_empty() {
            return Err(MortgageEngineError::InvalidRuleSet(
                "down payment tier table is empty".into(),
            ));
        }
        let mut prev_bound: Option<Money> = None;
        for (i, tier) in self.down_payment_tiers.iter().enumerate() {
            if tier.rate < Decimal::ZERO || tier.rate > Decimal::ONE {
                return Err(MortgageEngineError::InvalidRuleSet(format!(
                    "down payment tier {i} rate {} outside [0, 1]",
                    tier.rate
                )));
            }
            match (prev_bound, tier.upper_bound) {
                (Some(prev), Some(bound)) if bound <= prev => {
                    return Err(MortgageEngineError::InvalidRuleSet(format!(
                        "down payment tier {i} bound {bound} not above previous {prev}"
                    )));
                }
                (_, None) if i + 1 != self.down_payment_tiers.len() => {
                    return Err(MortgageEngineError::InvalidRuleSet(format!(
                        "open-ended down payment tier {i} is not last"
                    )));
                }
                _ => {}
            }
            prev_bound = tier.upper_bound;
        }
        if self
            .down_payment_tiers
            .last()
            .and_then(|t| t.upper_bound)
            .is_some()
        {
            return Err(MortgageEngineError::InvalidRuleSet(
                "last down payment tier must be open-ended".into(),
            ));
        }

        if self.ltv_brackets.is_empty() {
            return Err(MortgageEngineError::InvalidRuleSet(
                "LTV bracket table is empty".into(),
            ));
        }
        let mut prev_ltv = Decimal::ZERO;
        for (i, bracket) in self.ltv_brackets.iter().enumerate() {
            if i > 0 && bracket.max_ltv_percent <= prev_ltv {
                return Err(MortgageEngineError::InvalidRuleSet(format!(
                    "LTV bracket {i} bound {} not strictly ascending",
                    bracket.max_ltv_percent
                )));
            }
            if bracket.traditional_rate < Decimal::ZERO
                || bracket.non_traditional_rate < Decimal::ZERO
            {
                return Err(MortgageEngineError::InvalidRuleSet(format!(
                    "LTV bracket {i} has a negative rate"
                )));
            }
            prev_ltv = bracket.max_ltv_percent;
        }
        if prev_ltv != self.max_insurable_ltv_percent {
            return Err(MortgageEngineError::InvalidRuleSet(format!(
                "top LTV bracket bound {prev_ltv} does not match max insurable LTV {}",
                self.max_insurable_ltv_percent
            )));
        }

        if self.surcharges.high_price_floor > self.surcharges.high_price_ceiling {
            return Err(MortgageEngineError::InvalidRuleSet(
                "high-price surcharge floor exceeds ceiling".into(),
            ));
        }
        if self.insured_amortization_cap_years == 0
            || self.extended_amortization_cap_years < self.insured_amortization_cap_years
        {
            return Err(MortgageEngineError::InvalidRuleSet(
                "amortization caps are inconsistent".into(),
            ));
        }

        Ok(())
    }
}

impl Default for CmhcRuleSet {
    fn default() -> Self {
        CmhcRuleSet::cmhc_2025()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cmhc_2025_is_valid() {
        CmhcRuleSet::cmhc_2025().validate().unwrap();
    }

    #[test]
    fn test_bracket_boundary_belongs_to_lower_rate() {
        let rules = CmhcRuleSet::cmhc_2025();
        assert_eq!(
            rules.bracket_for_ltv(dec!(65)).unwrap().traditional_rate,
            dec!(0.0060)
        );
        assert_eq!(
            rules.bracket_for_ltv(dec!(65.01)).unwrap().traditional_rate,
            dec!(0.0170)
        );
        assert_eq!(
            rules.bracket_for_ltv(dec!(90)).unwrap().traditional_rate,
            dec!(0.0310)
        );
        assert_eq!(
            rules.bracket_for_ltv(dec!(95)).unwrap().traditional_rate,
            dec!(0.0400)
        );
    }

    #[test]
    fn test_bracket_above_table_is_none() {
        let rules = CmhcRuleSet::cmhc_2025();
        assert!(rules.bracket_for_ltv(dec!(95.01)).is_none());
    }

    #[test]
    fn test_non_traditional_differs_only_at_top() {
        let rules = CmhcRuleSet::cmhc_2025();
        for bracket in &rules.ltv_brackets {
            if bracket.max_ltv_percent < dec!(95) {
                assert_eq!(bracket.traditional_rate, bracket.non_traditional_rate);
            } else {
                assert_eq!(bracket.non_traditional_rate, dec!(0.0450));
            }
        }
    }

    #[test]
    fn test_validate_rejects_unsorted_brackets() {
        let mut rules = CmhcRuleSet::cmhc_2025();
        rules.ltv_brackets.swap(0, 1);
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bounded_last_tier() {
        let mut rules = CmhcRuleSet::cmhc_2025();
        rules.down_payment_tiers.last_mut().unwrap().upper_bound = Some(dec!(2_000_000));
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_rule_set_round_trips_through_json() {
        let rules = CmhcRuleSet::cmhc_2025();
        let json = serde_json::to_string(&rules).unwrap();
        let back: CmhcRuleSet = serde_json::from_str(&json).unwrap();
        back.validate().unwrap();
        assert_eq!(back.version, "cmhc-2025");
        assert_eq!(back.ltv_brackets.len(), rules.ltv_brackets.len());
    }
}
