use serde::{Deserialize, Serialize};

/// Identifier column used when none is configured.
pub const DEFAULT_IDENTIFIER_FIELD: &str = "payee id";

/// How the running cumulative total is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulationPolicy {
    /// Sum unrounded payments, round only the displayed value.
    #[default]
    Unrounded,
    /// Sum the already-rounded payments. Drifts when the payment does not
    /// divide evenly into cents.
    RoundedIncrements,
}

/// Normalized column names for the record fields of an uploaded sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub total_incentive: String,
    pub cap_percent: String,
    pub term: String,
    pub frequency: String,
    pub start_date: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        ColumnMap {
            total_incentive: "total incentive".into(),
            cap_percent: "cap %".into(),
            term: "term".into(),
            frequency: "payment frequency".into(),
            start_date: "payment start date".into(),
        }
    }
}

/// Options shared by resolution and schedule generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    pub identifier_field: String,
    pub columns: ColumnMap,
    pub accumulation: AccumulationPolicy,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        CalculatorConfig {
            identifier_field: DEFAULT_IDENTIFIER_FIELD.into(),
            columns: ColumnMap::default(),
            accumulation: AccumulationPolicy::default(),
        }
    }
}
