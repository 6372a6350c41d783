//! In-memory tabular data sources.
//!
//! A [`DataSource`] is what the tabular loader hands to the resolver: an
//! ordered list of rows keyed by normalized column name. Column names are
//! trimmed and lower-cased, cell values are trimmed. Row order is preserved
//! so that candidate indices reported for ambiguous matches line up with
//! the rows of the uploaded sheet.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One row: normalized column name -> trimmed cell text.
pub type Row = BTreeMap<String, String>;

/// Lower-case and trim a column name.
pub fn normalize_field(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSource {
    /// Display name, usually the file the rows came from
    pub name: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl DataSource {
    /// Build a source from header names and positional records. Records
    /// shorter than the header are padded with empty cells; extra cells
    /// are dropped.
    pub fn from_records<H, R, C>(name: impl Into<String>, headers: &[H], records: R) -> Self
    where
        H: AsRef<str>,
        R: IntoIterator<Item = Vec<C>>,
        C: AsRef<str>,
    {
        let headers: Vec<String> = headers.iter().map(|h| normalize_field(h.as_ref())).collect();
        let rows = records
            .into_iter()
            .map(|record| {
                headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| {
                        let cell = record.get(i).map(|c| c.as_ref().trim()).unwrap_or("");
                        (h.clone(), cell.to_string())
                    })
                    .collect()
            })
            .collect();
        DataSource {
            name: name.into(),
            columns: headers,
            rows,
        }
    }

    /// Build a source from already-keyed rows, normalizing keys and values.
    pub fn from_rows<I, K, V>(name: impl Into<String>, rows: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let rows: Vec<Row> = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(k, v)| (normalize_field(k.as_ref()), v.as_ref().trim().to_string()))
                    .collect()
            })
            .collect();
        let mut columns: Vec<String> = Vec::new();
        for key in rows.iter().flat_map(|r| r.keys()) {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        DataSource {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A source is eligible for resolution only when it has the identifier column.
    pub fn has_field(&self, field: &str) -> bool {
        let field = normalize_field(field);
        self.columns.iter().any(|c| *c == field)
    }

    /// Row indices whose identifier cell equals `id` exactly (after trim).
    pub fn matching_rows(&self, field: &str, id: &str) -> Vec<usize> {
        let field = normalize_field(field);
        let id = id.trim();
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.get(&field).map(String::as_str) == Some(id))
            .map(|(i, _)| i)
            .collect()
    }
}
