//! Occurrence expansion: recurrence rule → concrete dated occurrences.
//!
//! Everything here is a pure function of its inputs — no system clock, no
//! store access — so expanding the same (anchor, rule, horizon) twice
//! yields identical output. The anchor occurrence itself is never
//! re-emitted; the caller persists the anchor separately and every
//! expanded date is strictly after it.
//!
//! # Bounds
//!
//! Expansion stops at whichever of these is reached first:
//!
//! - the `horizon` date (exclusive),
//! - the rule's `end_date` (inclusive),
//! - the rule's `count` of produced occurrences,
//! - a hard cap of [`MAX_OCCURRENCES`] (five years of daily occurrences),
//!   which guarantees termination even for malformed rules.
//!
//! An exception date is dropped from the output but still consumes one
//! unit of the `count` budget — it is not re-substituted with a later
//! occurrence.

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::error::Result;
use crate::rule::{Frequency, RecurrenceRule};
use crate::slot::{SlotId, SlotKind, TimeSlot};

/// Hard cap on produced occurrences per expansion (≈ five years of daily).
pub const MAX_OCCURRENCES: u32 = 1825;

/// Sunday-based weekday index (0 = Sunday .. 6 = Saturday), matching the
/// indices stored in [`RecurrenceRule::days_of_week`].
fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(weekday_index(date), 0 | 6)
}

/// The Sunday starting the week containing `date`.
fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(weekday_index(date)))
}

/// Accumulates expanded dates while enforcing the shared stop bounds.
struct Expansion<'a> {
    rule: &'a RecurrenceRule,
    horizon: NaiveDate,
    dates: Vec<NaiveDate>,
    produced: u32,
}

impl Expansion<'_> {
    fn new(rule: &RecurrenceRule, horizon: NaiveDate) -> Expansion<'_> {
        Expansion {
            rule,
            horizon,
            dates: Vec::new(),
            produced: 0,
        }
    }

    /// Offer the next rule-produced date. Returns `false` once expansion
    /// must stop (horizon, end date, count, or safety cap reached).
    fn push(&mut self, date: NaiveDate) -> bool {
        if self.produced >= MAX_OCCURRENCES {
            return false;
        }
        if self.rule.count.is_some_and(|c| self.produced >= c) {
            return false;
        }
        if date >= self.horizon {
            return false;
        }
        if self.rule.end_date.is_some_and(|end| date > end) {
            return false;
        }
        self.produced += 1;
        if !self.rule.exceptions.contains(&date) {
            self.dates.push(date);
        }
        true
    }
}

// ── expand_dates ────────────────────────────────────────────────────────────

/// Expand a recurrence rule into the concrete dates it produces after
/// `anchor` and strictly before `horizon`.
///
/// The output is strictly ascending and never contains `anchor` itself.
///
/// # Errors
///
/// Returns [`crate::SlotError::Validation`] if the rule fails
/// [`RecurrenceRule::validate`].
pub fn expand_dates(
    anchor: NaiveDate,
    rule: &RecurrenceRule,
    horizon: NaiveDate,
) -> Result<Vec<NaiveDate>> {
    rule.validate()?;
    let mut exp = Expansion::new(rule, horizon);

    match rule.frequency {
        Frequency::Daily => expand_by_days(&mut exp, anchor, i64::from(rule.interval)),
        Frequency::Weekdays => expand_weekdays(&mut exp, anchor),
        Frequency::Weekly | Frequency::Custom => {
            if rule.days_of_week.is_empty() {
                // No explicit selection: repeat on the anchor's weekday.
                expand_by_days(&mut exp, anchor, i64::from(rule.interval) * 7);
            } else {
                expand_weekly_by_days(&mut exp, anchor);
            }
        }
        Frequency::Monthly => expand_by_months(&mut exp, anchor, rule.interval),
        Frequency::Yearly => expand_by_months(&mut exp, anchor, rule.interval.saturating_mul(12)),
    }

    Ok(exp.dates)
}

/// Fixed-stride expansion: occurrence `k` is `anchor + k * step_days`.
fn expand_by_days(exp: &mut Expansion<'_>, anchor: NaiveDate, step_days: i64) {
    for k in 1i64.. {
        let Some(offset) = k.checked_mul(step_days) else {
            break;
        };
        let Some(date) = anchor.checked_add_signed(Duration::days(offset)) else {
            break;
        };
        if !exp.push(date) {
            break;
        }
    }
}

/// Every Monday through Friday after the anchor. The interval is not
/// applied: every weekday qualifies.
fn expand_weekdays(exp: &mut Expansion<'_>, anchor: NaiveDate) {
    let mut current = anchor;
    loop {
        let Some(mut next) = current.succ_opt() else {
            break;
        };
        while is_weekend(next) {
            let Some(n) = next.succ_opt() else {
                return;
            };
            next = n;
        }
        current = next;
        if !exp.push(current) {
            break;
        }
    }
}

/// Weekly expansion over an explicit weekday selection.
///
/// Target weeks are the anchor's own (Sunday-started) week plus
/// `k * interval` weeks; within each target week the selected weekdays are
/// emitted in ascending order. Any date at or before the anchor is skipped,
/// which both suppresses re-emitting the anchor and keeps week zero inside
/// the strictly-after contract.
fn expand_weekly_by_days(exp: &mut Expansion<'_>, anchor: NaiveDate) {
    let rule = exp.rule;
    let anchor_week = start_of_week(anchor);
    let step = i64::from(rule.interval);

    'weeks: for k in 0i64.. {
        let Some(offset) = k.checked_mul(step) else {
            break;
        };
        let Some(week) = anchor_week.checked_add_signed(Duration::weeks(offset)) else {
            break;
        };
        if week >= exp.horizon {
            break;
        }
        for &day in &rule.days_of_week {
            let date = week + Duration::days(i64::from(day));
            if date <= anchor {
                continue;
            }
            if !exp.push(date) {
                break 'weeks;
            }
        }
    }
}

/// Month-stride expansion: occurrence `k` is `anchor + k * step_months`,
/// computed from the anchor each time so the day-of-month never drifts.
/// `chrono::Months` clamps to the last valid day of a shorter target month
/// (Jan 31 → Feb 28, but Mar 31 again the month after).
fn expand_by_months(exp: &mut Expansion<'_>, anchor: NaiveDate, step_months: u32) {
    for k in 1u32.. {
        let Some(months) = k.checked_mul(step_months) else {
            break;
        };
        let Some(date) = anchor.checked_add_months(Months::new(months)) else {
            break;
        };
        if !exp.push(date) {
            break;
        }
    }
}

// ── materialization ─────────────────────────────────────────────────────────

/// Copy the base slot's display fields onto each expanded date, tagging
/// every result as an instance of `parent_id` and recording the series
/// times for later divergence detection.
#[must_use]
pub fn materialize_instances(
    base: &TimeSlot,
    parent_id: SlotId,
    dates: &[NaiveDate],
) -> Vec<TimeSlot> {
    dates
        .iter()
        .map(|&date| TimeSlot {
            id: None,
            title: base.title.clone(),
            description: base.description.clone(),
            category: base.category.clone(),
            date,
            start_time: base.start_time,
            end_time: base.end_time,
            completed: base.completed,
            task_id: base.task_id,
            kind: SlotKind::SeriesInstance { parent_id },
            original_start_time: Some(base.start_time),
            original_end_time: Some(base.end_time),
        })
        .collect()
}

/// Expand a rule and materialize the resulting instances in one call.
///
/// # Errors
///
/// Same as [`expand_dates`].
pub fn expand_series(
    base: &TimeSlot,
    parent_id: SlotId,
    rule: &RecurrenceRule,
    horizon: NaiveDate,
) -> Result<Vec<TimeSlot>> {
    let dates = expand_dates(base.date, rule, horizon)?;
    Ok(materialize_instances(base, parent_id, &dates))
}
