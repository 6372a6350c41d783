//! Record resolution: data sources, row coercion and first-match-wins lookup.

pub mod coerce;
pub mod resolve;
pub mod source;

pub use resolve::{payee_ids, resolve, AmbiguousMatch, Candidate, Resolution};
pub use source::{DataSource, Row};
