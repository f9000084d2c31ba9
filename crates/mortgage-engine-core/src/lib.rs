//! CMHC-compliant mortgage calculation engine.
//!
//! Pure, deterministic, decimal-precision functions: no I/O, no clocks, no
//! shared state. Identical inputs always produce identical outputs.

pub mod affordability;
pub mod calculator;
pub mod down_payment;
pub mod error;
pub mod heloc;
pub mod payment;
pub mod premium;
pub mod rules;
pub mod types;

pub use error::MortgageEngineError;
pub use rules::CmhcRuleSet;
pub use types::*;

/// Standard result type for all engine operations
pub type EngineResult<T> = Result<T, MortgageEngineError>;
