pub mod config;
pub mod error;
pub mod overrides;
pub mod schedule;
pub mod types;

#[cfg(feature = "resolver")]
pub mod resolver;

pub use config::{AccumulationPolicy, CalculatorConfig, ColumnMap};
pub use error::AmortizationError;
pub use types::*;

/// Standard result type for all amortization operations
pub type AmortizationResult<T> = Result<T, AmortizationError>;
