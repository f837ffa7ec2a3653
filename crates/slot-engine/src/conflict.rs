//! Overlap detection among one day's slots, plus next-free-slot suggestion.
//!
//! Intervals are half-open `[start, end)`: a slot ending at 10:00 does not
//! conflict with one starting at 10:00. Both functions are pure — the
//! caller supplies the day's existing slots, typically straight from the
//! record store.

use std::fmt;

use serde::Serialize;

use crate::error::{Result, SlotError};
use crate::slot::{ClockTime, SlotId, TimeSlot};

/// Where a suggested free slot starts on an otherwise empty day (09:00).
pub const DEFAULT_DAY_START: ClockTime = ClockTime::from_minutes_unchecked(9 * 60);

// ── find_conflict ───────────────────────────────────────────────────────────

/// Identity and time range of the slot a candidate collides with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    /// The conflicting record's id, if it has been persisted.
    pub slot_id: Option<SlotId>,
    pub title: String,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "overlaps '{}' ({} to {})",
            self.title, self.start_time, self.end_time
        )
    }
}

/// Check a candidate time range against the existing slots for its date.
///
/// The first overlapping slot **in input order** wins — callers that want
/// the earliest conflict sort first. A slot whose id equals `exclude` is
/// skipped, so an edit never conflicts with itself.
///
/// # Errors
///
/// Returns [`SlotError::Validation`] if `end <= start`; an inverted range
/// is a validation problem, not a scheduling conflict.
pub fn find_conflict(
    start: ClockTime,
    end: ClockTime,
    existing: &[TimeSlot],
    exclude: Option<SlotId>,
) -> Result<Option<ConflictReport>> {
    if end <= start {
        return Err(SlotError::Validation(
            "end time must be after start time".to_string(),
        ));
    }
    for slot in existing {
        if slot.id.is_some() && slot.id == exclude {
            continue;
        }
        // Half-open interval intersection.
        if start < slot.end_time && slot.start_time < end {
            return Ok(Some(ConflictReport {
                slot_id: slot.id,
                title: slot.title.clone(),
                start_time: slot.start_time,
                end_time: slot.end_time,
            }));
        }
    }
    Ok(None)
}

// ── suggest_next_free ───────────────────────────────────────────────────────

/// A proposed open time range on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreeSlot {
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

/// Find the earliest free range of at least `duration_minutes` on a day.
///
/// Existing slots are scanned in ascending start order; the first
/// inter-slot gap big enough wins, placed immediately after the earlier
/// slot's end. With no adequate gap the range goes right after the last
/// slot, provided it still ends by 24:00. An empty day proposes
/// [`DEFAULT_DAY_START`]. Returns `None` when the day is too packed for
/// the requested duration.
#[must_use]
pub fn suggest_next_free(duration_minutes: u16, existing: &[TimeSlot]) -> Option<FreeSlot> {
    let free = |start: ClockTime| -> Option<FreeSlot> {
        let end = start.minutes().checked_add(duration_minutes)?;
        Some(FreeSlot {
            start_time: start,
            end_time: ClockTime::from_minutes(end).ok()?,
        })
    };

    if existing.is_empty() {
        return free(DEFAULT_DAY_START);
    }

    let mut sorted: Vec<&TimeSlot> = existing.iter().collect();
    sorted.sort_by_key(|slot| slot.start_time);

    for pair in sorted.windows(2) {
        let gap = pair[1]
            .start_time
            .minutes()
            .saturating_sub(pair[0].end_time.minutes());
        if gap >= duration_minutes {
            return free(pair[0].end_time);
        }
    }

    // Fall back to right after the last slot of the day.
    sorted.last().and_then(|last| free(last.end_time))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    fn slot(id: SlotId, title: &str, start: &str, end: &str) -> TimeSlot {
        let mut slot = TimeSlot::new(
            title,
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            t(start),
            t(end),
        );
        slot.id = Some(id);
        slot
    }

    #[test]
    fn test_overlapping_candidate_conflicts() {
        let existing = vec![slot(1, "Gym", "09:00", "10:00")];
        let report = find_conflict(t("09:30"), t("10:30"), &existing, None)
            .unwrap()
            .unwrap();
        assert_eq!(report.slot_id, Some(1));
        assert_eq!(report.title, "Gym");
        assert_eq!(report.to_string(), "overlaps 'Gym' (09:00 to 10:00)");
    }

    #[test]
    fn test_touching_boundaries_do_not_conflict() {
        let existing = vec![slot(1, "Gym", "09:00", "10:00")];
        assert_eq!(find_conflict(t("10:00"), t("11:00"), &existing, None).unwrap(), None);
        assert_eq!(find_conflict(t("08:00"), t("09:00"), &existing, None).unwrap(), None);
    }

    #[test]
    fn test_containment_conflicts_both_ways() {
        let existing = vec![slot(1, "Gym", "09:00", "10:00")];
        assert!(find_conflict(t("09:15"), t("09:45"), &existing, None)
            .unwrap()
            .is_some());
        assert!(find_conflict(t("08:00"), t("11:00"), &existing, None)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_inverted_range_is_validation_not_conflict() {
        let err = find_conflict(t("10:00"), t("10:00"), &[], None).unwrap_err();
        assert!(matches!(err, SlotError::Validation(_)));
    }

    #[test]
    fn test_edited_slot_excluded_by_id() {
        let existing = vec![slot(1, "Gym", "09:00", "10:00")];
        let report = find_conflict(t("09:00"), t("10:30"), &existing, Some(1)).unwrap();
        assert_eq!(report, None);
    }

    #[test]
    fn test_first_match_in_input_order_wins() {
        let existing = vec![
            slot(2, "Lunch", "12:00", "13:00"),
            slot(1, "Gym", "09:00", "10:00"),
        ];
        let report = find_conflict(t("09:30"), t("12:30"), &existing, None)
            .unwrap()
            .unwrap();
        // Unsorted input: the scan reports "Lunch" first.
        assert_eq!(report.slot_id, Some(2));
    }

    #[test]
    fn test_suggest_gap_between_slots() {
        let existing = vec![
            slot(1, "A", "09:00", "10:00"),
            slot(2, "B", "11:00", "12:00"),
        ];
        let free = suggest_next_free(60, &existing).unwrap();
        assert_eq!(free.start_time, t("10:00"));
        assert_eq!(free.end_time, t("11:00"));
    }

    #[test]
    fn test_suggest_skips_too_small_gap() {
        let existing = vec![
            slot(1, "A", "09:00", "10:00"),
            slot(2, "B", "10:30", "11:00"),
            slot(3, "C", "12:00", "13:00"),
        ];
        let free = suggest_next_free(60, &existing).unwrap();
        assert_eq!(free.start_time, t("11:00"));
    }

    #[test]
    fn test_suggest_after_last_slot() {
        let existing = vec![
            slot(1, "A", "09:00", "10:00"),
            slot(2, "B", "10:00", "11:00"),
        ];
        let free = suggest_next_free(90, &existing).unwrap();
        assert_eq!(free.start_time, t("11:00"));
        assert_eq!(free.end_time, t("12:30"));
    }

    #[test]
    fn test_suggest_default_anchor_on_empty_day() {
        let free = suggest_next_free(60, &[]).unwrap();
        assert_eq!(free.start_time, t("09:00"));
        assert_eq!(free.end_time, t("10:00"));
    }

    #[test]
    fn test_suggest_none_when_day_cannot_fit() {
        let existing = vec![slot(1, "All day", "08:00", "23:30")];
        assert_eq!(suggest_next_free(60, &existing), None);
    }

    #[test]
    fn test_suggest_fits_exactly_to_end_of_day() {
        let existing = vec![slot(1, "Late", "22:00", "23:00")];
        let free = suggest_next_free(60, &existing).unwrap();
        assert_eq!(free.end_time, ClockTime::END_OF_DAY);
    }

    #[test]
    fn test_suggest_unsorted_input_is_sorted_first() {
        let existing = vec![
            slot(2, "B", "11:00", "12:00"),
            slot(1, "A", "09:00", "10:00"),
        ];
        let free = suggest_next_free(60, &existing).unwrap();
        assert_eq!(free.start_time, t("10:00"));
    }
}
