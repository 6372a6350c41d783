//! Manual entry on top of (or instead of) a resolved record.
//!
//! Every field the user supplies replaces the resolved value. When nothing
//! was resolved the record starts from [`PayeeRecord::blank`], so an
//! unresolved payee with no manual input ends up with a zero term and is
//! refused by the generator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{Frequency, Money, PayeeRecord, Percent};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordOverrides {
    pub payee_id: Option<String>,
    pub total_incentive: Option<Money>,
    pub cap_percent: Option<Percent>,
    pub term: Option<u32>,
    pub frequency: Option<Frequency>,
    pub start_date: Option<NaiveDate>,
}

impl RecordOverrides {
    pub fn is_empty(&self) -> bool {
        *self == RecordOverrides::default()
    }

    /// Apply to `base`, or to blank defaults dated `today` when nothing was resolved.
    pub fn apply(&self, base: Option<PayeeRecord>, today: NaiveDate) -> PayeeRecord {
        let mut record = base.unwrap_or_else(|| PayeeRecord::blank(today));
        if let Some(id) = &self.payee_id {
            record.payee_id = id.trim().to_string();
        }
        if let Some(v) = self.total_incentive {
            record.total_incentive = v;
        }
        if let Some(v) = self.cap_percent {
            record.cap_percent = v;
        }
        if let Some(v) = self.term {
            record.term = v;
        }
        if let Some(v) = self.frequency {
            record.frequency = v;
        }
        if let Some(v) = self.start_date {
            record.start_date = v;
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_overrides_replace_resolved_fields() {
        let base = PayeeRecord {
            payee_id: "P1".into(),
            total_incentive: dec!(12000),
            cap_percent: dec!(90),
            term: 12,
            frequency: Frequency::Monthly,
            start_date: ymd(2025, 2, 1),
        };
        let overrides = RecordOverrides {
            term: Some(6),
            frequency: Some(Frequency::Quarterly),
            ..RecordOverrides::default()
        };
        let r = overrides.apply(Some(base), ymd(2030, 1, 1));
        assert_eq!(r.payee_id, "P1");
        assert_eq!(r.total_incentive, dec!(12000));
        assert_eq!(r.term, 6);
        assert_eq!(r.frequency, Frequency::Quarterly);
        assert_eq!(r.start_date, ymd(2025, 2, 1));
    }

    #[test]
    fn test_no_base_falls_back_to_blank() {
        let overrides = RecordOverrides {
            payee_id: Some(" P9 ".into()),
            ..RecordOverrides::default()
        };
        let r = overrides.apply(None, ymd(2026, 10, 16));
        assert_eq!(r.payee_id, "P9");
        assert_eq!(r.term, 0);
        assert_eq!(r.total_incentive, dec!(0));
        assert_eq!(r.start_date, ymd(2026, 10, 16));
    }

    #[test]
    fn test_is_empty() {
        assert!(RecordOverrides::default().is_empty());
        assert!(!RecordOverrides {
            term: Some(1),
            ..RecordOverrides::default()
        }
        .is_empty());
    }
}
