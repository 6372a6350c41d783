use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Percentages as entered by the user (90 = 90%). Divided by 100 before use.
pub type Percent = Decimal;

/// Payment cadence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    #[default]
    #[serde(alias = "monthly")]
    Monthly,
    #[serde(alias = "quarterly")]
    Quarterly,
}

impl Frequency {
    /// Nominal days between payments. Not calendar-month arithmetic.
    pub fn day_step(self) -> i64 {
        match self {
            Frequency::Monthly => 30,
            Frequency::Quarterly => 90,
        }
    }

    /// Anything starting with "m" (any case) is monthly, everything else quarterly.
    pub fn from_label(raw: &str) -> Self {
        if raw.trim().to_lowercase().starts_with('m') {
            Frequency::Monthly
        } else {
            Frequency::Quarterly
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Monthly => write!(f, "Monthly"),
            Frequency::Quarterly => write!(f, "Quarterly"),
        }
    }
}

/// The unit the schedule generator operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayeeRecord {
    pub payee_id: String,
    pub total_incentive: Money,
    pub cap_percent: Percent,
    pub term: u32,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
}

impl PayeeRecord {
    /// Manual-entry defaults used when nothing was resolved from a data source.
    pub fn blank(start_date: NaiveDate) -> Self {
        PayeeRecord {
            payee_id: String::new(),
            total_incentive: Decimal::ZERO,
            cap_percent: Decimal::ZERO,
            term: 0,
            frequency: Frequency::Monthly,
            start_date,
        }
    }
}

/// A single row of a payment schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRow {
    pub payee_id: String,
    /// 1-indexed
    pub payment_number: u32,
    pub payment_date: NaiveDate,
    /// Rounded to 2 dp
    pub payment_amount: Money,
    /// Rounded to 2 dp
    pub cumulative_amount: Money,
    /// One step past the last payment date; identical on every row
    pub schedule_end_date: NaiveDate,
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
