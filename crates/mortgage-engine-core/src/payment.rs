//! Payment amortization.
//!
//! Level-payment annuity math over a choice of payment frequencies, plus full
//! amortization schedule generation. No amortization cap is enforced here;
//! the insured 25/30-year caps are caller policy, checked in `calculator`.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::MortgageEngineError;
use crate::types::{with_metadata, ComputationOutput, Money, PaymentFrequency, Percent, Rate};
use crate::EngineResult;

/// Balance below this is treated as fully repaid.
const BALANCE_EPSILON: Decimal = dec!(0.01);

/// How a quoted annual rate converts to a per-period rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Compounding {
    /// Nominal annual rate divided by periods per year.
    #[default]
    Nominal,
    /// Canadian fixed-rate convention: the quoted rate compounds
    /// semi-annually, so the per-period rate is (1 + q/2)^(2/ppy) - 1.
    SemiAnnual,
}

/// Input for schedule generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    /// Amount financed (loan plus any insurance premium).
    pub principal: Money,
    /// Quoted annual rate in percent (5.79 = 5.79%).
    pub annual_rate_percent: Percent,
    /// Amortization in years.
    pub amortization_years: u32,
    #[serde(default)]
    pub frequency: PaymentFrequency,
    #[serde(default)]
    pub compounding: Compounding,
}

/// One row of an amortization schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// 1-based period number.
    pub period: u32,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    /// Balance remaining after this payment.
    pub balance: Money,
}

/// Output of schedule generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutput {
    /// Level payment per period.
    pub periodic_payment: Money,
    pub entries: Vec<ScheduleEntry>,
    /// Number of payments actually made (accelerated frequencies repay
    /// ahead of the scheduled amortization).
    pub periods: u32,
    pub total_interest: Money,
    pub total_paid: Money,
}

/// Iterative power: base^exp for a non-negative integer exponent.
/// Avoids `powd()` precision drift over hundreds of periods.
fn decimal_pow(base: Decimal, exp: u32) -> Decimal {
    let mut result = Decimal::ONE;
    for _ in 0..exp {
        result *= base;
    }
    result
}

/// Per-period interest rate for a quoted annual rate.
pub fn periodic_rate(
    annual_rate_percent: Percent,
    frequency: PaymentFrequency,
    compounding: Compounding,
) -> Rate {
    let quoted = annual_rate_percent / dec!(100);
    let ppy = Decimal::from(frequency.periods_per_year());
    match compounding {
        Compounding::Nominal => quoted / ppy,
        Compounding::SemiAnnual => {
            let half = Decimal::ONE + quoted / dec!(2);
            half.powd(dec!(2) / ppy) - Decimal::ONE
        }
    }
}

/// Level payment per period for a fully amortizing loan.
///
/// Standard annuity formula; zero-rate loans divide the principal evenly.
/// Accelerated frequencies take half (bi-weekly) or a quarter (weekly) of
/// the monthly payment instead of solving the annuity at their own period
/// count.
pub fn periodic_payment(
    principal: Money,
    annual_rate_percent: Percent,
    amortization_years: u32,
    frequency: PaymentFrequency,
    compounding: Compounding,
) -> EngineResult<Money> {
    validate_payment_inputs(principal, annual_rate_percent, amortization_years)?;

    if frequency.is_accelerated() {
        let monthly = periodic_payment(
            principal,
            annual_rate_percent,
            amortization_years,
            PaymentFrequency::Monthly,
            compounding,
        )?;
        let divisor = match frequency {
            PaymentFrequency::AcceleratedBiWeekly => dec!(2),
            _ => dec!(4),
        };
        return Ok(monthly / divisor);
    }

    let n = amortization_years * frequency.periods_per_year();
    let r = periodic_rate(annual_rate_percent, frequency, compounding);

    if r.is_zero() {
        return Ok(principal / Decimal::from(n));
    }

    let factor = decimal_pow(Decimal::ONE + r, n);
    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        return Err(MortgageEngineError::DivisionByZero {
            context: "payment annuity factor".into(),
        });
    }

    Ok(principal * r * factor / denominator)
}

/// Generate a full amortization schedule with the standard output envelope.
pub fn amortization_schedule(
    input: &ScheduleInput,
) -> EngineResult<ComputationOutput<ScheduleOutput>> {
    let start = Instant::now();

    let payment = periodic_payment(
        input.principal,
        input.annual_rate_percent,
        input.amortization_years,
        input.frequency,
        input.compounding,
    )?
    .round_dp(2);

    let r = periodic_rate(input.annual_rate_percent, input.frequency, input.compounding);
    let scheduled_periods = input.amortization_years * input.frequency.periods_per_year();

    // Accelerated payments retire the loan early; allow the loop to stop on
    // balance instead of period count, but never run past the scheduled term.
    let mut entries: Vec<ScheduleEntry> = Vec::with_capacity(scheduled_periods as usize);
    let mut balance = input.principal;
    let mut total_interest = Decimal::ZERO;
    let mut total_paid = Decimal::ZERO;

    for period in 1..=scheduled_periods {
        if balance < BALANCE_EPSILON {
            break;
        }

        let interest = (balance * r).round_dp(2);
        let mut principal_part = payment - interest;
        let mut paid = payment;

        // Final payment clears the exact remaining balance: cent rounding on
        // the level payment leaves a small residual either way.
        if principal_part >= balance || period == scheduled_periods {
            principal_part = balance;
            paid = balance + interest;
        }

        balance -= principal_part;
        total_interest += interest;
        total_paid += paid;

        entries.push(ScheduleEntry {
            period,
            payment: paid,
            interest,
            principal: principal_part,
            balance,
        });
    }

    let periods = entries.len() as u32;
    let output = ScheduleOutput {
        periodic_payment: payment,
        entries,
        periods,
        total_interest: total_interest.round_dp(2),
        total_paid: total_paid.round_dp(2),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level-Payment Amortization Schedule",
        input,
        Vec::new(),
        elapsed,
        output,
    ))
}

fn validate_payment_inputs(
    principal: Money,
    annual_rate_percent: Percent,
    amortization_years: u32,
) -> EngineResult<()> {
    if principal <= Decimal::ZERO {
        return Err(MortgageEngineError::InvalidInput {
            field: "principal".into(),
            reason: "Principal must be positive".into(),
        });
    }
    if annual_rate_percent < Decimal::ZERO {
        return Err(MortgageEngineError::InvalidInput {
            field: "annual_rate_percent".into(),
            reason: "Rate cannot be negative".into(),
        });
    }
    if amortization_years == 0 {
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

    const TOL: Decimal = dec!(0.05);

    fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal, msg: &str) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "{}: expected ~{}, got {} (diff = {})",
            msg,
            expected,
            actual,
            diff
        );
    }

    // -----------------------------------------------------------------------
    // 1. Known values
    // -----------------------------------------------------------------------
    #[test]
    fn test_monthly_payment_known_value() {
        // 500k at 5.79% nominal over 25 years: r = 0.004825, n = 300.
        let p = periodic_payment(
            dec!(500_000),
            dec!(5.79),
            25,
            PaymentFrequency::Monthly,
            Compounding::Nominal,
        )
        .unwrap();
        assert_close(p, dec!(3157.63), TOL, "monthly payment");
    }

    #[test]
    fn test_zero_rate_divides_evenly() {
        let p = periodic_payment(
            dec!(100_000),
            Decimal::ZERO,
            10,
            PaymentFrequency::Monthly,
            Compounding::Nominal,
        )
        .unwrap();
        assert_eq!(p.round_dp(2), dec!(833.33));
    }

    #[test]
    fn test_semi_annual_compounding_is_cheaper() {
        // Canadian convention yields a lower effective monthly rate than
        // nominal/12 for the same quote, so the payment is lower.
        let nominal = periodic_payment(
            dec!(500_000),
            dec!(5.79),
            25,
            PaymentFrequency::Monthly,
            Compounding::Nominal,
        )
        .unwrap();
        let canadian = periodic_payment(
            dec!(500_000),
            dec!(5.79),
            25,
            PaymentFrequency::Monthly,
            Compounding::SemiAnnual,
        )
        .unwrap();
        assert!(canadian < nominal);
        assert_close(canadian, dec!(3136.90), dec!(0.50), "Canadian monthly payment");
    }

    // -----------------------------------------------------------------------
    // 2. Frequencies
    // -----------------------------------------------------------------------
    #[test]
    fn test_all_period_counts_supported() {
        for (freq, ppy) in [
            (PaymentFrequency::Monthly, 12u32),
            (PaymentFrequency::SemiMonthly, 24),
            (PaymentFrequency::BiWeekly, 26),
            (PaymentFrequency::Weekly, 52),
        ] {
            let p = periodic_payment(
                dec!(120_000),
                Decimal::ZERO,
                10,
                freq,
                Compounding::Nominal,
            )
            .unwrap();
            assert_eq!(p, dec!(120_000) / Decimal::from(10 * ppy));
        }
    }

    #[test]
    fn test_accelerated_biweekly_is_half_monthly() {
        let monthly = periodic_payment(
            dec!(400_000),
            dec!(5.0),
            25,
            PaymentFrequency::Monthly,
            Compounding::Nominal,
        )
        .unwrap();
        let accel = periodic_payment(
            dec!(400_000),
            dec!(5.0),
            25,
            PaymentFrequency::AcceleratedBiWeekly,
            Compounding::Nominal,
        )
        .unwrap();
        assert_eq!(accel, monthly / dec!(2));
    }

    #[test]
    fn test_accelerated_weekly_is_quarter_monthly() {
        let monthly = periodic_payment(
            dec!(400_000),
            dec!(5.0),
            25,
            PaymentFrequency::Monthly,
            Compounding::Nominal,
        )
        .unwrap();
        let accel = periodic_payment(
            dec!(400_000),
            dec!(5.0),
            25,
            PaymentFrequency::AcceleratedWeekly,
            Compounding::Nominal,
        )
        .unwrap();
        assert_eq!(accel, monthly / dec!(4));
    }

    // -----------------------------------------------------------------------
    // 3. Invalid inputs
    // -----------------------------------------------------------------------
    #[test]
    fn test_zero_principal_rejected() {
        assert!(periodic_payment(
            Decimal::ZERO,
            dec!(5.0),
            25,
            PaymentFrequency::Monthly,
            Compounding::Nominal,
        )
        .is_err());
    }

    #[test]
    fn test_negative_rate_rejected() {
        assert!(periodic_payment(
            dec!(100_000),
            dec!(-1),
            25,
            PaymentFrequency::Monthly,
            Compounding::Nominal,
        )
        .is_err());
    }

    #[test]
    fn test_zero_years_rejected() {
        assert!(periodic_payment(
            dec!(100_000),
            dec!(5.0),
            0,
            PaymentFrequency::Monthly,
            Compounding::Nominal,
        )
        .is_err());
    }

    // -----------------------------------------------------------------------
    // 4. Schedule
    // -----------------------------------------------------------------------
    fn standard_schedule_input() -> ScheduleInput {
        ScheduleInput {
            principal: dec!(300_000),
            annual_rate_percent: dec!(5.0),
            amortization_years: 25,
            frequency: PaymentFrequency::Monthly,
            compounding: Compounding::Nominal,
        }
    }

    #[test]
    fn test_schedule_runs_to_zero_balance() {
        let out = amortization_schedule(&standard_schedule_input())
            .unwrap()
            .result;
        assert_eq!(out.periods, 300);
        let last = out.entries.last().unwrap();
        assert_eq!(last.balance, Decimal::ZERO);
    }

    #[test]
    fn test_schedule_first_period_interest() {
        let out = amortization_schedule(&standard_schedule_input())
            .unwrap()
            .result;
        // 300,000 * 0.05/12 = 1,250.00
        assert_eq!(out.entries[0].interest, dec!(1250));
        assert_eq!(
            out.entries[0].principal,
            out.periodic_payment - dec!(1250)
        );
    }

    #[test]
    fn test_schedule_totals_are_consistent() {
        let out = amortization_schedule(&standard_schedule_input())
            .unwrap()
            .result;
        let sum_interest: Decimal = out.entries.iter().map(|e| e.interest).sum();
        let sum_paid: Decimal = out.entries.iter().map(|e| e.payment).sum();
        assert_eq!(out.total_interest, sum_interest.round_dp(2));
        assert_eq!(out.total_paid, sum_paid.round_dp(2));
        // Everything paid is either interest or the original principal.
        assert_eq!(
            (out.total_paid - out.total_interest).round_dp(2),
            dec!(300_000)
        );
    }

    #[test]
    fn test_schedule_balance_strictly_decreasing() {
        let out = amortization_schedule(&standard_schedule_input())
            .unwrap()
            .result;
        let mut prev = dec!(300_000);
        for entry in &out.entries {
            assert!(entry.balance < prev, "balance rose at period {}", entry.period);
            prev = entry.balance;
        }
    }

    #[test]
    fn test_accelerated_schedule_pays_off_early() {
        let mut input = standard_schedule_input();
        input.frequency = PaymentFrequency::AcceleratedBiWeekly;
        let out = amortization_schedule(&input).unwrap().result;
        assert!(out.periods < 25 * 26, "accelerated loan should retire early");
        assert_eq!(out.entries.last().unwrap().balance, Decimal::ZERO);
    }

    #[test]
    fn test_zero_rate_schedule() {
        let input = ScheduleInput {
            principal: dec!(120_000),
            annual_rate_percent: Decimal::ZERO,
            amortization_years: 10,
            frequency: PaymentFrequency::Monthly,
            compounding: Compounding::Nominal,
        };
        let out = amortization_schedule(&input).unwrap().result;
        assert_eq!(out.total_interest, Decimal::ZERO);
        assert_eq!(out.total_paid, dec!(120_000));
        assert_eq!(out.periods, 120);
    }

    // -----------------------------------------------------------------------
    // 5. Idempotence
    // -----------------------------------------------------------------------
    #[test]
    fn test_identical_inputs_identical_outputs() {
        let a = periodic_payment(
            dec!(500_000),
            dec!(5.79),
            25,
            PaymentFrequency::Monthly,
            Compounding::Nominal,
        )
        .unwrap();
        let b = periodic_payment(
            dec!(500_000),
            dec!(5.79),
            25,
            PaymentFrequency::Monthly,
            Compounding::Nominal,
        )
        .unwrap();
        assert_eq!(a, b);
    }
}
