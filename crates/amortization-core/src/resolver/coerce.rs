//! Type coercion from raw spreadsheet cells into a [`PayeeRecord`].
//!
//! Cells arrive as trimmed text. Numbers may carry thousands separators or
//! a leading `$`; the cap may carry a trailing `%`. Dates are accepted in
//! any representation that names a single calendar day. Any failure is a
//! [`AmortizationError::CoercionError`] naming the column and raw value.

use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::config::ColumnMap;
use crate::error::AmortizationError;
use crate::resolver::source::{normalize_field, Row};
use crate::types::{Frequency, Money, PayeeRecord, Percent};
use crate::AmortizationResult;

/// Date formats tried in order before the numeric fallbacks.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
];

/// Largest serial Excel accepts (9999-12-31).
const EXCEL_MAX_SERIAL: i64 = 2_958_465;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Coerce a resolved row into a typed record.
pub fn coerce_record(
    row: &Row,
    identifier_field: &str,
    columns: &ColumnMap,
) -> AmortizationResult<PayeeRecord> {
    let payee_id = cell(row, identifier_field)?;
    if payee_id.is_empty() {
        return Err(AmortizationError::coercion(
            identifier_field,
            payee_id,
            "identifier is empty",
        ));
    }

    Ok(PayeeRecord {
        payee_id: payee_id.to_string(),
        total_incentive: parse_money(
            &columns.total_incentive,
            cell(row, &columns.total_incentive)?,
        )?,
        cap_percent: parse_percent(&columns.cap_percent, cell(row, &columns.cap_percent)?)?,
        term: parse_term(&columns.term, cell(row, &columns.term)?)?,
        frequency: Frequency::from_label(cell(row, &columns.frequency)?),
        start_date: parse_date(&columns.start_date, cell(row, &columns.start_date)?)?,
    })
}

/// Parse a non-negative monetary amount.
pub fn parse_money(field: &str, raw: &str) -> AmortizationResult<Money> {
    let cleaned = clean_numeric(raw);
    let cleaned = cleaned.strip_prefix('$').unwrap_or(&cleaned);
    parse_non_negative(field, raw, cleaned)
}

/// Parse a non-negative percentage, with or without a trailing `%`.
pub fn parse_percent(field: &str, raw: &str) -> AmortizationResult<Percent> {
    let cleaned = clean_numeric(raw);
    let cleaned = cleaned.strip_suffix('%').unwrap_or(&cleaned).trim_end();
    parse_non_negative(field, raw, cleaned)
}

/// Parse a payment count. Integral decimals ("12.0") are accepted since
/// spreadsheet exports often render whole numbers that way.
pub fn parse_term(field: &str, raw: &str) -> AmortizationResult<u32> {
    let cleaned = clean_numeric(raw);
    let value = parse_non_negative(field, raw, &cleaned)?;
    if !value.fract().is_zero() {
        return Err(AmortizationError::coercion(
            field,
            raw,
            "term must be a whole number",
        ));
    }
    value
        .to_u32()
        .ok_or_else(|| AmortizationError::coercion(field, raw, "term is too large"))
}

/// Parse a calendar date from any unambiguous representation.
pub fn parse_date(field: &str, raw: &str) -> AmortizationResult<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(AmortizationError::coercion(field, raw, "empty value"));
    }

    // chrono reads %Y with as few as one digit, so "5/1/20" would parse as year 5
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            if d.year() >= 1000 {
                return Ok(d);
            }
        }
    }

    // ISO date-time; the time component is dropped
    if s.len() > 10 && s.is_char_boundary(10) {
        let (head, tail) = s.split_at(10);
        if tail.starts_with('T') || tail.starts_with(' ') {
            if let Ok(d) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
                return Ok(d);
            }
        }
    }

    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y%m%d") {
            return Ok(d);
        }
    }

    if let Some(d) = parse_day_month_year(field, raw, s)? {
        return Ok(d);
    }

    if let Ok(serial) = Decimal::from_str(s) {
        return excel_serial_to_date(field, raw, serial);
    }

    Err(AmortizationError::coercion(
        field,
        raw,
        "unrecognised date format",
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn cell<'a>(row: &'a Row, field: &str) -> AmortizationResult<&'a str> {
    row.get(&normalize_field(field))
        .map(String::as_str)
        .ok_or_else(|| AmortizationError::coercion(field, "", "column is missing"))
}

fn clean_numeric(raw: &str) -> String {
    raw.trim().replace(',', "")
}

fn parse_non_negative(field: &str, raw: &str, cleaned: &str) -> AmortizationResult<Decimal> {
    if cleaned.is_empty() {
        return Err(AmortizationError::coercion(field, raw, "empty value"));
    }
    let value = Decimal::from_str(cleaned)
        .or_else(|_| Decimal::from_scientific(cleaned))
        .map_err(|_| AmortizationError::coercion(field, raw, "not a number"))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AmortizationError::coercion(
            field,
            raw,
            "must be non-negative",
        ));
    }
    Ok(value)
}

/// `D/M/YYYY` or `M/D/YYYY` (also with `-` or `.`), accepted only when the
/// order can be told apart: one of the leading parts exceeds 12, or both
/// are equal. Returns `Ok(None)` when the input has a different shape.
fn parse_day_month_year(field: &str, raw: &str, s: &str) -> AmortizationResult<Option<NaiveDate>> {
    let parts: Vec<&str> = s.split(['/', '-', '.']).collect();
    if parts.len() != 3 || parts[2].len() != 4 {
        return Ok(None);
    }
    let nums: Vec<u32> = match parts.iter().map(|p| p.parse::<u32>()).collect() {
        Ok(n) => n,
        Err(_) => return Ok(None),
    };
    let (a, b, year) = (nums[0], nums[1], nums[2] as i32);

    let (month, day) = if a == b || (b > 12 && a <= 12) {
        (a, b)
    } else if a > 12 && b <= 12 {
        (b, a)
    } else if a <= 12 && b <= 12 {
        return Err(AmortizationError::coercion(
            field,
            raw,
            "ambiguous day/month order",
        ));
    } else {
        return Err(AmortizationError::coercion(field, raw, "invalid date"));
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .map(Some)
        .ok_or_else(|| AmortizationError::coercion(field, raw, "invalid date"))
}

fn excel_serial_to_date(field: &str, raw: &str, serial: Decimal) -> AmortizationResult<NaiveDate> {
    let days = serial
        .trunc()
        .to_i64()
        .filter(|d| (1..=EXCEL_MAX_SERIAL).contains(d))
        .ok_or_else(|| AmortizationError::coercion(field, raw, "date serial out of range"))?;
    // Excel's day zero, adjusted for its phantom 1900-02-29
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .ok_or_else(|| AmortizationError::DateError("invalid Excel epoch".into()))?;
    epoch
        .checked_add_signed(Duration::days(days))
        .ok_or_else(|| AmortizationError::coercion(field, raw, "date serial out of range"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
