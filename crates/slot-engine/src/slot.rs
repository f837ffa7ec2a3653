//! The persisted time-slot record and its supporting types.
//!
//! Times are naive wall-clock values at minute resolution and dates are
//! naive calendar dates — the planner stores what the user typed, with no
//! timezone conversion anywhere. [`ClockTime`] round-trips the `"HH:MM"`
//! strings the host application persists.
//!
//! Whether a slot is a plain entry, the parent of a recurring series, or a
//! generated instance is carried by the [`SlotKind`] variant rather than a
//! combination of boolean flags, so every place where slot type determines
//! behavior (deletion scope, edit scope, conflict scope) matches on it
//! exhaustively.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SlotError;
use crate::rule::RecurrenceRule;

/// Identifier assigned by the record store on insert.
pub type SlotId = u64;

// ── ClockTime ───────────────────────────────────────────────────────────────

/// Minutes after midnight on the end-of-day boundary.
pub const MINUTES_PER_DAY: u16 = 1440;

/// A wall-clock time of day at minute resolution.
///
/// Valid values span `00:00` through `24:00` inclusive; `24:00` exists only
/// so an end time can land exactly on the end-of-day boundary. Displays as
/// and parses from `"HH:MM"`.
///
/// # Examples
///
/// ```
/// use slot_engine::ClockTime;
///
/// let t: ClockTime = "09:30".parse().unwrap();
/// assert_eq!(t.minutes(), 570);
/// assert_eq!(t.to_string(), "09:30");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    /// The end-of-day boundary (`24:00`).
    pub const END_OF_DAY: ClockTime = ClockTime(MINUTES_PER_DAY);

    /// Crate-internal const constructor for known-valid offsets.
    pub(crate) const fn from_minutes_unchecked(minutes: u16) -> Self {
        ClockTime(minutes)
    }

    /// Build from an hour and minute on the 24-hour clock.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Validation`] if `hour > 23` or `minute > 59`.
    pub fn new(hour: u16, minute: u16) -> Result<Self, SlotError> {
        if hour > 23 || minute > 59 {
            return Err(SlotError::Validation(format!(
                "invalid clock time {hour:02}:{minute:02}"
            )));
        }
        Ok(ClockTime(hour * 60 + minute))
    }

    /// Build from a minute-of-day offset (`0..=1440`).
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Validation`] if the offset is past `24:00`.
    pub fn from_minutes(minutes: u16) -> Result<Self, SlotError> {
        if minutes > MINUTES_PER_DAY {
            return Err(SlotError::Validation(format!(
                "minute offset {minutes} is past end of day"
            )));
        }
        Ok(ClockTime(minutes))
    }

    /// Minutes after midnight.
    #[must_use]
    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for ClockTime {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SlotError::Validation(format!("invalid time string '{s}'"));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u16 = h.parse().map_err(|_| invalid())?;
        let minute: u16 = m.parse().map_err(|_| invalid())?;
        if hour == 24 && minute == 0 {
            return Ok(ClockTime::END_OF_DAY);
        }
        ClockTime::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for ClockTime {
    type Error = SlotError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ClockTime> for String {
    fn from(t: ClockTime) -> String {
        t.to_string()
    }
}

// ── SlotKind ────────────────────────────────────────────────────────────────

/// What role a slot record plays in the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SlotKind {
    /// An ordinary one-off slot.
    Standalone,
    /// The anchor of a recurring series; owns the rule its instances were
    /// generated from. The parent is itself a dated occurrence (the first
    /// one), but it is never re-emitted by expansion.
    SeriesParent(RecurrenceRule),
    /// A generated occurrence belonging to the series whose parent has
    /// `parent_id`.
    #[serde(rename_all = "camelCase")]
    SeriesInstance { parent_id: SlotId },
}

impl SlotKind {
    /// True for the anchor of a recurring series.
    #[must_use]
    pub fn is_parent(&self) -> bool {
        matches!(self, SlotKind::SeriesParent(_))
    }

    /// True for a generated occurrence.
    #[must_use]
    pub fn is_instance(&self) -> bool {
        matches!(self, SlotKind::SeriesInstance { .. })
    }

    /// The owning parent's id, for instances.
    #[must_use]
    pub fn parent_id(&self) -> Option<SlotId> {
        match self {
            SlotKind::SeriesInstance { parent_id } => Some(*parent_id),
            SlotKind::Standalone | SlotKind::SeriesParent(_) => None,
        }
    }

    /// The recurrence rule, for series parents.
    #[must_use]
    pub fn rule(&self) -> Option<&RecurrenceRule> {
        match self {
            SlotKind::SeriesParent(rule) => Some(rule),
            SlotKind::Standalone | SlotKind::SeriesInstance { .. } => None,
        }
    }
}

// ── TimeSlot ────────────────────────────────────────────────────────────────

/// One concrete, dated entry in the daily planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    /// Store-assigned identifier; `None` until first persisted.
    pub id: Option<SlotId>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    /// Completion is per-record; toggling one instance never touches its
    /// siblings.
    #[serde(default)]
    pub completed: bool,
    /// Weak reference to an external task record; lookup only.
    #[serde(default)]
    pub task_id: Option<u64>,
    #[serde(flatten)]
    pub kind: SlotKind,
    /// The series times at generation, recorded on instances so a host can
    /// later detect a per-instance divergence. No engine path edits them.
    #[serde(default)]
    pub original_start_time: Option<ClockTime>,
    #[serde(default)]
    pub original_end_time: Option<ClockTime>,
}

impl TimeSlot {
    /// Build an unsaved standalone slot with the given display title and
    /// time range.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        date: NaiveDate,
        start_time: ClockTime,
        end_time: ClockTime,
    ) -> Self {
        TimeSlot {
            id: None,
            title: title.into(),
            description: None,
            category: None,
            date,
            start_time,
            end_time,
            completed: false,
            task_id: None,
            kind: SlotKind::Standalone,
            original_start_time: None,
            original_end_time: None,
        }
    }

    /// Slot duration in minutes. Zero or garbage if the range is invalid;
    /// callers validate ordering before relying on this.
    #[must_use]
    pub fn duration_minutes(&self) -> u16 {
        self.end_time.minutes().saturating_sub(self.start_time.minutes())
    }
}
