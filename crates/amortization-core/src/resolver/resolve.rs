//! Payee record resolution across uploaded data sources.
//!
//! Sources are scanned in the order they were supplied. The first source
//! that holds any row for the requested identifier wins outright; later
//! sources are never consulted for that identifier, even when they look
//! more complete. Within the winning source a single row resolves
//! directly, while several rows yield an [`AmbiguousMatch`] that the
//! caller settles with [`AmbiguousMatch::select`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{CalculatorConfig, ColumnMap};
use crate::error::AmortizationError;
use crate::resolver::coerce::coerce_record;
use crate::resolver::source::{normalize_field, DataSource, Row};
use crate::types::PayeeRecord;
use crate::AmortizationResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Outcome of resolving one identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// Exactly one row matched in the winning source
    Found {
        source: String,
        row_index: usize,
        record: PayeeRecord,
    },
    /// Several rows matched in the winning source
    Ambiguous(AmbiguousMatch),
    /// No eligible source holds the identifier
    NotFound { payee_id: String },
}

impl Resolution {
    /// The resolved record, if resolution completed in one step.
    pub fn record(&self) -> Option<&PayeeRecord> {
        match self {
            Resolution::Found { record, .. } => Some(record),
            _ => None,
        }
    }
}

/// Candidate rows sharing one identifier within a single source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmbiguousMatch {
    pub payee_id: String,
    pub source: String,
    pub candidates: Vec<Candidate>,
    identifier_field: String,
    columns: ColumnMap,
}

/// One row offered for disambiguation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Position of the row within its source (0-indexed)
    pub row_index: usize,
    /// "Term: …, Frequency: …, Start Date: …"
    pub summary: String,
    pub row: Row,
}

impl AmbiguousMatch {
    /// Second step of disambiguation: coerce the candidate at `index`
    /// (a position in `candidates`, not a source row index).
    pub fn select(&self, index: usize) -> AmortizationResult<PayeeRecord> {
        let candidate =
            self.candidates
                .get(index)
                .ok_or(AmortizationError::SelectionOutOfRange {
                    index,
                    candidates: self.candidates.len(),
                })?;
        debug!(
            payee_id = %self.payee_id,
            source = %self.source,
            row_index = candidate.row_index,
            "selected candidate row"
        );
        coerce_record(&candidate.row, &self.identifier_field, &self.columns)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Distinct identifier values across all eligible sources, in first-seen
/// order. Blank identifier cells are ignored.
pub fn payee_ids(sources: &[DataSource], identifier_field: &str) -> Vec<String> {
    let field = normalize_field(identifier_field);
    let mut seen: HashSet<&str> = HashSet::new();
    let mut ids: Vec<String> = Vec::new();
    for source in eligible(sources, &field) {
        for row in source.rows() {
            if let Some(id) = row.get(&field).filter(|id| !id.is_empty()) {
                if seen.insert(id.as_str()) {
                    ids.push(id.clone());
                }
            }
        }
    }
    ids
}

/// Resolve `payee_id` against `sources` using first-match-wins.
///
/// Returns `Err` only when the single matching row cannot be coerced;
/// `NotFound` and `Ambiguous` are ordinary outcomes.
pub fn resolve(
    sources: &[DataSource],
    payee_id: &str,
    config: &CalculatorConfig,
) -> AmortizationResult<Resolution> {
    let field = normalize_field(&config.identifier_field);
    let payee_id = payee_id.trim();

    for source in eligible(sources, &field) {
        let matches = source.matching_rows(&field, payee_id);
        match matches.as_slice() {
            [] => continue,
            [row_index] => {
                debug!(payee_id, source = %source.name, row_index, "resolved payee");
                let record = coerce_record(&source.rows()[*row_index], &field, &config.columns)?;
                return Ok(Resolution::Found {
                    source: source.name.clone(),
                    row_index: *row_index,
                    record,
                });
            }
            _ => {
                debug!(
                    payee_id,
                    source = %source.name,
                    candidates = matches.len(),
                    "multiple rows match payee"
                );
                let candidates = matches
                    .iter()
                    .map(|&i| {
                        let row = source.rows()[i].clone();
                        Candidate {
                            row_index: i,
                            summary: summarize(&row, &config.columns),
                            row,
                        }
                    })
                    .collect();
                return Ok(Resolution::Ambiguous(AmbiguousMatch {
                    payee_id: payee_id.to_string(),
                    source: source.name.clone(),
                    candidates,
                    identifier_field: field.clone(),
                    columns: config.columns.clone(),
                }));
            }
        }
    }

    debug!(payee_id, "payee not found in any source");
    Ok(Resolution::NotFound {
        payee_id: payee_id.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn eligible<'a>(
    sources: &'a [DataSource],
    field: &'a str,
) -> impl Iterator<Item = &'a DataSource> + 'a {
    sources.iter().filter(move |s| {
        let ok = s.has_field(field);
        if !ok {
            debug!(source = %s.name, field, "skipping source without identifier column");
        }
        ok
    })
}

fn summarize(row: &Row, columns: &ColumnMap) -> String {
    let get = |c: &str| {
        row.get(&normalize_field(c))
            .map(String::as_str)
            .unwrap_or("")
    };
    format!(
        "Term: {}, Frequency: {}, Start Date: {}",
        get(&columns.term),
        get(&columns.frequency),
        get(&columns.start_date)
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Frequency;
    use rust_decimal_macros::dec;

    const HEADERS: [&str; 6] = [
        "Payee ID",
        "Total Incentive",
        "Cap %",
        "Term",
        "Payment Frequency",
        "Payment Start Date",
    ];

    fn source(name: &str, rows: Vec<[&str; 6]>) -> DataSource {
        DataSource::from_records(name, &HEADERS, rows.into_iter().map(|r| r.to_vec()))
    }

    #[test]
    fn test_single_match_resolves() {
        let s = source(
            "a",
            vec![["P1", "12000", "90", "12", "Monthly", "2025-02-01"]],
        );
        let res = resolve(&[s], "P1", &CalculatorConfig::default()).unwrap();
        let record = res.record().unwrap();
        assert_eq!(record.total_incentive, dec!(12000));
        assert_eq!(record.frequency, Frequency::Monthly);
    }

    #[test]
    fn test_lookup_trims_requested_id() {
        let s = source("a", vec![["P1", "1", "1", "1", "m", "2025-01-01"]]);
        let res = resolve(&[s], "  P1 ", &CalculatorConfig::default()).unwrap();
        assert!(res.record().is_some());
    }

    #[test]
    fn test_not_found() {
        let s = source("a", vec![["P1", "1", "1", "1", "m", "2025-01-01"]]);
        let res = resolve(&[s], "P2", &CalculatorConfig::default()).unwrap();
        assert!(matches!(res, Resolution::NotFound { ref payee_id } if payee_id == "P2"));
    }

    #[test]
    fn test_no_sources_is_not_found() {
        let res = resolve(&[], "P1", &CalculatorConfig::default()).unwrap();
        assert!(matches!(res, Resolution::NotFound { .. }));
    }

    #[test]
    fn test_ambiguous_lists_candidates_in_row_order() {
        let s = source(
            "a",
            vec![
                ["P1", "1000", "100", "12", "Monthly", "2025-01-01"],
                ["P2", "1", "1", "1", "m", "2025-01-01"],
                ["P1", "2000", "50", "4", "Quarterly", "2025-06-01"],
            ],
        );
        let res = resolve(&[s], "P1", &CalculatorConfig::default()).unwrap();
        let Resolution::Ambiguous(m) = res else {
            panic!("expected ambiguous resolution");
        };
        assert_eq!(m.candidates.len(), 2);
        assert_eq!(m.candidates[0].row_index, 0);
        assert_eq!(m.candidates[1].row_index, 2);
        assert_eq!(
            m.candidates[1].summary,
            "Term: 4, Frequency: Quarterly, Start Date: 2025-06-01"
        );

        let picked = m.select(1).unwrap();
        assert_eq!(picked.total_incentive, dec!(2000));
        assert_eq!(picked.term, 4);
        assert_eq!(picked.frequency, Frequency::Quarterly);
    }

    #[test]
    fn test_select_out_of_range() {
        let s = source(
            "a",
            vec![
                ["P1", "1", "1", "1", "m", "2025-01-01"],
                ["P1", "2", "1", "1", "m", "2025-01-01"],
            ],
        );
        let Resolution::Ambiguous(m) = resolve(&[s], "P1", &CalculatorConfig::default()).unwrap()
        else {
            panic!("expected ambiguous resolution");
        };
        assert!(matches!(
            m.select(2),
            Err(AmortizationError::SelectionOutOfRange { index: 2, candidates: 2 })
        ));
    }

    #[test]
    fn test_coercion_failure_surfaces() {
        let s = source("a", vec![["P1", "abc", "90", "12", "m", "2025-01-01"]]);
        let err = resolve(&[s], "P1", &CalculatorConfig::default()).unwrap_err();
        assert!(matches!(err, AmortizationError::CoercionError { .. }));
    }

    #[test]
    fn test_payee_ids_union_first_seen() {
        let a = source(
            "a",
            vec![
                ["P2", "1", "1", "1", "m", "2025-01-01"],
                ["P1", "1", "1", "1", "m", "2025-01-01"],
                ["P2", "1", "1", "1", "m", "2025-01-01"],
            ],
        );
        let b = source(
            "b",
            vec![
                ["P3", "1", "1", "1", "m", "2025-01-01"],
                ["", "1", "1", "1", "m", "2025-01-01"],
                ["P1", "1", "1", "1", "m", "2025-01-01"],
            ],
        );
        let unrelated = DataSource::from_records("c", &["employee"], vec![vec!["P9"]]);
        assert_eq!(payee_ids(&[a, unrelated, b], "payee id"), vec!["P2", "P1", "P3"]);
    }

    #[test]
    fn test_payee_ids_many_repeated_rows() {
        let records = (0..5000).map(|i| vec![format!("P{}", i % 100)]);
        let s = DataSource::from_records("big", &["Payee ID"], records);
        let ids = payee_ids(&[s], "payee id");
        assert_eq!(ids.len(), 100);
        assert_eq!(ids[0], "P0");
        assert_eq!(ids[99], "P99");
    }

    #[test]
    fn test_custom_identifier_field() {
        let s = DataSource::from_records(
            "a",
            &[
                "Employee",
                "Total Incentive",
                "Cap %",
                "Term",
                "Payment Frequency",
                "Payment Start Date",
            ],
            vec![vec!["E7", "500", "100", "5", "Monthly", "2025-01-01"]],
        );
        let config = CalculatorConfig {
            identifier_field: "EMPLOYEE".into(),
            ..CalculatorConfig::default()
        };
        let res = resolve(&[s], "E7", &config).unwrap();
        assert_eq!(res.record().unwrap().payee_id, "E7");
    }
}
