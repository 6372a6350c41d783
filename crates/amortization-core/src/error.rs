use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmortizationError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Cannot coerce {field} value '{value}': {reason}")]
    CoercionError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Term is 0 for payee '{payee_id}'. Cannot calculate amortization.")]
    EmptyTerm { payee_id: String },

    #[error("Selection {index} is out of range ({candidates} candidate rows)")]
    SelectionOutOfRange { index: usize, candidates: usize },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl AmortizationError {
    pub(crate) fn coercion(field: &str, value: &str, reason: impl Into<String>) -> Self {
        AmortizationError::CoercionError {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// True for the zero-term guard, which callers report as a warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, AmortizationError::EmptyTerm { .. })
    }
}

impl From<serde_json::Error> for AmortizationError {
    fn from(e: serde_json::Error) -> Self {
        AmortizationError::SerializationError(e.to_string())
    }
}
