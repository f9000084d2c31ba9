use thiserror::Error;

#[derive(Debug, Error)]
pub enum MortgageEngineError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid rule set: {0}")]
    InvalidRuleSet(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for MortgageEngineError {
    fn from(e: serde_json::Error) -> Self {
        MortgageEngineError::SerializationError(e.to_string())
    }
}
