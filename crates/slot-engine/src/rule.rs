//! The declarative description of how a planner entry repeats.
//!
//! A [`RecurrenceRule`] says nothing about concrete dates; expansion into
//! dated occurrences lives in [`crate::expander`]. Weekday indices are
//! Sunday-based (`0` = Sunday .. `6` = Saturday), matching what the host
//! application has always persisted.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};

/// How often a series repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every `interval` days.
    Daily,
    /// Every Monday through Friday. `interval` does not apply.
    Weekdays,
    /// Every `interval` weeks, either on the anchor's weekday or on an
    /// explicit `days_of_week` selection.
    Weekly,
    /// Every `interval` months on the anchor's day-of-month, clamped to
    /// the last day of shorter months.
    Monthly,
    /// Every `interval` years on the anchor's month and day.
    Yearly,
    /// Same semantics as [`Frequency::Weekly`]; kept as a distinct value
    /// because the host stores it.
    Custom,
}

/// A declarative repeat description for a recurring series.
///
/// The serde shape matches the host's persisted JSON: lowercase frequency
/// strings and camelCase field names (`daysOfWeek`, `endDate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// "Every N units"; must be at least 1.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Sunday-based weekday selection; meaningful only for
    /// `weekly`/`custom`. Empty means "the anchor's weekday".
    #[serde(default)]
    pub days_of_week: BTreeSet<u8>,
    /// Occurrences strictly after this date are not generated.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Cap on the number of rule-produced occurrences. If both `end_date`
    /// and `count` are set, whichever bound is reached first stops
    /// expansion.
    #[serde(default)]
    pub count: Option<u32>,
    /// Dates the rule would produce but must skip (not re-substituted).
    #[serde(default)]
    pub exceptions: BTreeSet<NaiveDate>,
}

fn default_interval() -> u32 {
    1
}

impl RecurrenceRule {
    /// A rule repeating every `interval` units with no end bound.
    #[must_use]
    pub fn every(frequency: Frequency, interval: u32) -> Self {
        RecurrenceRule {
            frequency,
            interval,
            days_of_week: BTreeSet::new(),
            end_date: None,
            count: None,
            exceptions: BTreeSet::new(),
        }
    }

    /// Check the rule's structural invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Validation`] if `interval` is zero or a
    /// `days_of_week` entry is outside `0..=6`.
    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(SlotError::Validation(
                "recurrence interval must be at least 1".to_string(),
            ));
        }
        if let Some(day) = self.days_of_week.iter().find(|d| **d > 6) {
            return Err(SlotError::Validation(format!(
                "weekday index {day} is outside 0..=6 (0 = Sunday)"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_validate_accepts_simple_rule() {
        assert!(RecurrenceRule::every(Frequency::Daily, 1).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let rule = RecurrenceRule::every(Frequency::Weekly, 0);
        let err = rule.validate().unwrap_err().to_string();
        assert!(err.contains("interval"), "got: {err}");
    }

    #[test]
    fn test_validate_rejects_bad_weekday_index() {
        let mut rule = RecurrenceRule::every(Frequency::Weekly, 1);
        rule.days_of_week.insert(7);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_serde_shape_matches_host_json() {
        let json = r#"{
            "frequency": "weekly",
            "interval": 2,
            "daysOfWeek": [1, 3, 5],
            "endDate": "2026-06-30",
            "exceptions": ["2026-04-06"]
        }"#;
        let rule: RecurrenceRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.frequency, Frequency::Weekly);
        assert_eq!(rule.interval, 2);
        assert_eq!(rule.days_of_week, BTreeSet::from([1, 3, 5]));
        assert_eq!(rule.end_date, Some(date(2026, 6, 30)));
        assert!(rule.exceptions.contains(&date(2026, 4, 6)));
        assert_eq!(rule.count, None);

        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["frequency"], "weekly");
        assert_eq!(value["daysOfWeek"][0], 1);
    }

    #[test]
    fn test_interval_defaults_to_one() {
        let rule: RecurrenceRule = serde_json::from_str(r#"{"frequency": "daily"}"#).unwrap();
        assert_eq!(rule.interval, 1);
    }
}
