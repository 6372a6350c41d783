//! Flat incentive amortization schedules.
//!
//! The capped incentive (`total_incentive * cap_percent / 100`) is split
//! into `term` equal payments. Payment dates step a fixed number of days
//! from the start date (30 for monthly, 90 for quarterly) rather than
//! following calendar months, so payment *i* falls on
//! `start_date + step * (i - 1)` and the schedule ends one step after the
//! last payment. Displayed amounts are rounded to cents; how the running
//! total is accumulated is governed by [`AccumulationPolicy`].

use std::time::Instant;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AccumulationPolicy;
use crate::error::AmortizationError;
use crate::types::{with_metadata, ComputationOutput, Frequency, Money, PayeeRecord, PaymentRow};
use crate::AmortizationResult;

/// Decimal places for displayed amounts.
const DISPLAY_DP: u32 = 2;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    #[serde(flatten)]
    pub record: PayeeRecord,
    #[serde(default)]
    pub accumulation: AccumulationPolicy,
}

impl ScheduleInput {
    /// Parse a request of the shape written by `serde_json::to_string`.
    pub fn from_json(json: &str) -> AmortizationResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<PayeeRecord> for ScheduleInput {
    fn from(record: PayeeRecord) -> Self {
        ScheduleInput {
            record,
            accumulation: AccumulationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutput {
    pub payee_id: String,
    pub frequency: Frequency,
    pub day_step: i64,
    /// Capped incentive divided by term, before rounding
    pub payment_amount_unrounded: Money,
    /// Cumulative amount on the final row
    pub total_disbursed: Money,
    pub schedule_end_date: NaiveDate,
    pub rows: Vec<PaymentRow>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Generate the full payment schedule for one payee.
///
/// A zero term yields [`AmortizationError::EmptyTerm`] rather than an empty
/// schedule.
pub fn generate_schedule(
    input: &ScheduleInput,
) -> AmortizationResult<ComputationOutput<ScheduleOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let record = &input.record;

    validate_input(record)?;

    if record.cap_percent > dec!(100) {
        warnings.push(format!(
            "Cap of {}% exceeds 100%; schedule disburses more than the total incentive.",
            record.cap_percent
        ));
    }

    let step = record.frequency.day_step();
    let term = Decimal::from(record.term);
    let capped_total = record
        .total_incentive
        .checked_mul(record.cap_percent)
        .and_then(|v| v.checked_div(dec!(100)))
        .ok_or_else(|| too_large("total_incentive"))?;
    let payment = capped_total / term;
    let displayed_payment = payment.round_dp(DISPLAY_DP);
    let rounded_total = displayed_payment
        .checked_mul(term)
        .ok_or_else(|| too_large("total_incentive"))?;

    if capped_total.is_zero() {
        warnings.push("Capped incentive is zero; every payment is 0.00.".into());
    } else if input.accumulation == AccumulationPolicy::RoundedIncrements
        && rounded_total != capped_total
    {
        warnings.push(format!(
            "Rounded increments sum to {} against a capped total of {}.",
            rounded_total,
            capped_total.round_dp(DISPLAY_DP)
        ));
    }

    let end_date = offset_date(record.start_date, step * i64::from(record.term))?;

    let mut rows = Vec::with_capacity(record.term as usize);
    let mut cumulative = Decimal::ZERO;
    for number in 1..=record.term {
        let payment_date = offset_date(record.start_date, step * i64::from(number - 1))?;
        let increment = match input.accumulation {
            AccumulationPolicy::Unrounded => payment,
            AccumulationPolicy::RoundedIncrements => displayed_payment,
        };
        cumulative = cumulative
            .checked_add(increment)
            .ok_or_else(|| too_large("total_incentive"))?;
        rows.push(PaymentRow {
            payee_id: record.payee_id.clone(),
            payment_number: number,
            payment_date,
            payment_amount: displayed_payment,
            cumulative_amount: cumulative.round_dp(DISPLAY_DP),
            schedule_end_date: end_date,
        });
    }

    let total_disbursed = rows
        .last()
        .map(|r| r.cumulative_amount)
        .unwrap_or(Decimal::ZERO);

    debug!(
        payee_id = %record.payee_id,
        term = record.term,
        step,
        %payment,
        "generated schedule"
    );

    let output = ScheduleOutput {
        payee_id: record.payee_id.clone(),
        frequency: record.frequency,
        day_step: step,
        payment_amount_unrounded: payment,
        total_disbursed,
        schedule_end_date: end_date,
        rows,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "day_step": format!("{step} days ({})", record.frequency),
        "payment_sizing": "flat: total_incentive * cap% / term",
        "accumulation": input.accumulation,
        "display_rounding": "2 dp, round half to even",
    });

    Ok(with_metadata(
        "Flat incentive amortization (fixed-day cadence)",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_input(record: &PayeeRecord) -> AmortizationResult<()> {
    // Zero term is reported ahead of any other input problem
    if record.term == 0 {
        return Err(AmortizationError::EmptyTerm {
            payee_id: record.payee_id.clone(),
        });
    }
    if record.payee_id.trim().is_empty() {
        return Err(AmortizationError::InvalidInput {
            field: "payee_id".into(),
            reason: "Payee ID must not be empty".into(),
        });
    }
    if record.total_incentive < Decimal::ZERO {
        return Err(AmortizationError::InvalidInput {
            field: "total_incentive".into(),
            reason: "Total incentive must be non-negative".into(),
        });
    }
    if record.cap_percent < Decimal::ZERO {
        return Err(AmortizationError::InvalidInput {
            field: "cap_percent".into(),
            reason: "Cap must be non-negative".into(),
        });
    }
    Ok(())
}

fn too_large(field: &str) -> AmortizationError {
    AmortizationError::InvalidInput {
        field: field.into(),
        reason: "Amount is too large to schedule".into(),
    }
}

fn offset_date(start: NaiveDate, days: i64) -> AmortizationResult<NaiveDate> {
    start
        .checked_add_signed(Duration::days(days))
        .ok_or_else(|| AmortizationError::DateError(format!("{start} + {days} days is out of range")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(total: Decimal, cap: Decimal, term: u32, frequency: Frequency) -> PayeeRecord {
        PayeeRecord {
            payee_id: "P-100".into(),
            total_incentive: total,
            cap_percent: cap,
            term,
            frequency,
            start_date: ymd(2025, 2, 1),
        }
    }

    fn run(record: PayeeRecord, accumulation: AccumulationPolicy) -> ScheduleOutput {
        generate_schedule(&ScheduleInput {
            record,
            accumulation,
        })
        .unwrap()
        .result
    }

    #[test]
    fn test_reference_monthly_schedule() {
        let out = run(
            record(dec!(12000), dec!(90), 12, Frequency::Monthly),
            AccumulationPolicy::Unrounded,
        );
        assert_eq!(out.rows.len(), 12);
        assert!(out.rows.iter().all(|r| r.payment_amount == dec!(900.00)));
        assert_eq!(out.rows[0].payment_date, ymd(2025, 2, 1));
        assert_eq!(out.rows[1].payment_date, ymd(2025, 3, 3));
        assert_eq!(out.rows[2].payment_date, ymd(2025, 4, 2));
        assert_eq!(out.rows[11].cumulative_amount, dec!(10800.00));
        assert_eq!(out.schedule_end_date, ymd(2026, 1, 27));
        assert_eq!(out.total_disbursed, dec!(10800));
    }

    #[test]
    fn test_reference_schedule_same_under_both_policies() {
        let a = run(
            record(dec!(12000), dec!(90), 12, Frequency::Monthly),
            AccumulationPolicy::Unrounded,
        );
        let b = run(
            record(dec!(12000), dec!(90), 12, Frequency::Monthly),
            AccumulationPolicy::RoundedIncrements,
        );
        assert_eq!(a.rows, b.rows);
    }

    #[test]
    fn test_policies_diverge_on_uneven_split() {
        // 1000 / 3 = 333.333...
        let unrounded = run(
            record(dec!(1000), dec!(100), 3, Frequency::Monthly),
            AccumulationPolicy::Unrounded,
        );
        let rounded = run(
            record(dec!(1000), dec!(100), 3, Frequency::Monthly),
            AccumulationPolicy::RoundedIncrements,
        );
        assert_eq!(unrounded.rows[2].cumulative_amount, dec!(1000.00));
        assert_eq!(rounded.rows[2].cumulative_amount, dec!(999.99));
        assert_eq!(unrounded.rows[1].cumulative_amount, dec!(666.67));
        assert_eq!(rounded.rows[1].cumulative_amount, dec!(666.66));
    }

    #[test]
    fn test_rounded_increments_warns_on_drift() {
        let out = generate_schedule(&ScheduleInput {
            record: record(dec!(1000), dec!(100), 3, Frequency::Monthly),
            accumulation: AccumulationPolicy::RoundedIncrements,
        })
        .unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("999.99")));
    }

    #[test]
    fn test_quarterly_steps_ninety_days() {
        let out = run(
            record(dec!(4000), dec!(100), 4, Frequency::Quarterly),
            AccumulationPolicy::Unrounded,
        );
        for pair in out.rows.windows(2) {
            assert_eq!((pair[1].payment_date - pair[0].payment_date).num_days(), 90);
        }
        assert_eq!(out.schedule_end_date, ymd(2025, 2, 1) + Duration::days(360));
    }

    #[test]
    fn test_rows_contiguous_and_end_date_constant() {
        let out = run(
            record(dec!(5000), dec!(75), 7, Frequency::Monthly),
            AccumulationPolicy::Unrounded,
        );
        let numbers: Vec<u32> = out.rows.iter().map(|r| r.payment_number).collect();
        assert_eq!(numbers, (1..=7).collect::<Vec<u32>>());
        assert!(out.rows.iter().all(|r| r.schedule_end_date == out.schedule_end_date));
        assert_eq!(out.schedule_end_date, ymd(2025, 2, 1) + Duration::days(30 * 7));
        assert!(out
            .rows
            .windows(2)
            .all(|p| p[1].payment_date > p[0].payment_date));
    }

    #[test]
    fn test_unrounded_payments_sum_to_capped_total() {
        let out = run(
            record(dec!(10000), dec!(85), 7, Frequency::Monthly),
            AccumulationPolicy::Unrounded,
        );
        let sum = out.payment_amount_unrounded * Decimal::from(7);
        assert!((sum - dec!(8500)).abs() < dec!(0.0000001));
        assert_eq!(out.total_disbursed, dec!(8500.00));
    }

    #[test]
    fn test_zero_term_is_error_not_empty() {
        let err = generate_schedule(&record(dec!(1000), dec!(100), 0, Frequency::Monthly).into())
            .unwrap_err();
        assert!(err.is_warning());
        assert!(matches!(err, AmortizationError::EmptyTerm { ref payee_id } if payee_id == "P-100"));
    }

    #[test]
    fn test_empty_payee_rejected() {
        let mut r = record(dec!(1000), dec!(100), 2, Frequency::Monthly);
        r.payee_id = "  ".into();
        assert!(matches!(
            generate_schedule(&r.into()),
            Err(AmortizationError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_zero_incentive_warns() {
        let out =
            generate_schedule(&record(dec!(0), dec!(90), 3, Frequency::Monthly).into()).unwrap();
        assert!(out.result.rows.iter().all(|r| r.payment_amount.is_zero()));
        assert!(out.warnings.iter().any(|w| w.contains("zero")));
    }

    #[test]
    fn test_cap_above_hundred_warns() {
        let out =
            generate_schedule(&record(dec!(1000), dec!(120), 2, Frequency::Monthly).into()).unwrap();
        assert_eq!(out.result.total_disbursed, dec!(1200.00));
        assert!(out.warnings.iter().any(|w| w.contains("exceeds 100%")));
    }

    #[test]
    fn test_deterministic() {
        let r = record(dec!(7777), dec!(33.3), 9, Frequency::Quarterly);
        let a = run(r.clone(), AccumulationPolicy::Unrounded);
        let b = run(r, AccumulationPolicy::Unrounded);
        assert_eq!(a.rows, b.rows);
    }

    #[test]
    fn test_zero_term_reported_before_missing_payee() {
        let mut r = record(dec!(1000), dec!(100), 0, Frequency::Monthly);
        r.payee_id = String::new();
        let err = generate_schedule(&r.into()).unwrap_err();
        assert!(err.is_warning());
    }

    #[test]
    fn test_capped_total_overflow_is_error() {
        let r = record(Decimal::MAX, dec!(90), 12, Frequency::Monthly);
        match generate_schedule(&r.into()) {
            Err(AmortizationError::InvalidInput { field, .. }) => {
                assert_eq!(field, "total_incentive")
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_from_json_reads_flattened_record() {
        let input = ScheduleInput::from_json(
            r#"{"payee_id":"P-9","total_incentive":"600","cap_percent":"50","term":3,
                "frequency":"Quarterly","start_date":"2025-01-01","accumulation":"rounded_increments"}"#,
        )
        .unwrap();
        assert_eq!(input.record.term, 3);
        assert_eq!(input.accumulation, AccumulationPolicy::RoundedIncrements);
        assert_eq!(run(input.record, input.accumulation).total_disbursed, dec!(300.00));
    }

    #[test]
    fn test_from_json_malformed_is_serialization_error() {
        assert!(matches!(
            ScheduleInput::from_json(r#"{"payee_id": "P-9", "term": "#),
            Err(AmortizationError::SerializationError(_))
        ));
    }

    #[test]
    fn test_date_overflow_is_error() {
        let mut r = record(dec!(1000), dec!(100), 2, Frequency::Monthly);
        r.start_date = NaiveDate::MAX;
        assert!(matches!(
            generate_schedule(&r.into()),
            Err(AmortizationError::DateError(_))
        ));
    }
}
