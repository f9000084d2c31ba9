use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.04 = 4%). Never as percentages.
pub type Rate = Decimal;

/// Values expressed as percentages (95 = 95%), used for LTV and quoted rates.
pub type Percent = Decimal;

/// How often a payment is made against the mortgage.
///
/// Accelerated variants derive the payment from the monthly amount (half or a
/// quarter of it) rather than from the annuity formula directly, so the
/// borrower makes the equivalent of one extra monthly payment per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFrequency {
    #[default]
    Monthly,
    SemiMonthly,
    BiWeekly,
    Weekly,
    AcceleratedBiWeekly,
    AcceleratedWeekly,
}

impl PaymentFrequency {
    /// Number of payments per year.
    pub fn periods_per_year(&self) -> u32 {
        match self {
            PaymentFrequency::Monthly => 12,
            PaymentFrequency::SemiMonthly => 24,
            PaymentFrequency::BiWeekly | PaymentFrequency::AcceleratedBiWeekly => 26,
            PaymentFrequency::Weekly | PaymentFrequency::AcceleratedWeekly => 52,
        }
    }

    /// Whether the payment amount is derived from the monthly payment.
    pub fn is_accelerated(&self) -> bool {
        matches!(
            self,
            PaymentFrequency::AcceleratedBiWeekly | PaymentFrequency::AcceleratedWeekly
        )
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
