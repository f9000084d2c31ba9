pub mod affordability;
pub mod calculator;
pub mod down_payment;
pub mod heloc;
pub mod payment;
pub mod premium;

use clap::ValueEnum;
use mortgage_engine_core::payment::Compounding;
use mortgage_engine_core::PaymentFrequency;

/// Payment frequency as a CLI flag value.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FrequencyArg {
    Monthly,
    SemiMonthly,
    BiWeekly,
    Weekly,
    AcceleratedBiWeekly,
    AcceleratedWeekly,
}

impl From<FrequencyArg> for PaymentFrequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Monthly => PaymentFrequency::Monthly,
            FrequencyArg::SemiMonthly => PaymentFrequency::SemiMonthly,
            FrequencyArg::BiWeekly => PaymentFrequency::BiWeekly,
            FrequencyArg::Weekly => PaymentFrequency::Weekly,
            FrequencyArg::AcceleratedBiWeekly => PaymentFrequency::AcceleratedBiWeekly,
            FrequencyArg::AcceleratedWeekly => PaymentFrequency::AcceleratedWeekly,
        }
    }
}

/// Rate compounding convention as a CLI flag value.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompoundingArg {
    /// Nominal annual rate divided by periods per year.
    Nominal,
    /// Canadian semi-annual compounding of the quoted rate.
    SemiAnnual,
}

impl From<CompoundingArg> for Compounding {
    fn from(arg: CompoundingArg) -> Self {
        match arg {
            CompoundingArg::Nominal => Compounding::Nominal,
            CompoundingArg::SemiAnnual => Compounding::SemiAnnual,
        }
    }
}
