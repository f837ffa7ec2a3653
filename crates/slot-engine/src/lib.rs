//! # slot-engine
//!
//! Deterministic recurring time-slot computation for a local-first daily
//! planner.
//!
//! The engine covers the one part of a planner that is more than CRUD
//! glue: expanding a recurrence rule into concrete dated occurrences,
//! vetting candidate slots against a day's schedule, and keeping the
//! parent/instance linkage of a recurring series consistent under edits
//! and deletes. Dates and times are naive/local throughout — the planner
//! stores what the user typed, with no timezone conversion.
//!
//! ## Modules
//!
//! - [`rule`] — declarative recurrence rules (frequency, interval, weekday
//!   selection, end conditions, exception dates)
//! - [`slot`] — the persisted slot record, `Standalone` / `SeriesParent` /
//!   `SeriesInstance` tagged variant, and `"HH:MM"` clock times
//! - [`expander`] — rule → ordered list of concrete dates (pure, bounded)
//! - [`conflict`] — half-open overlap detection and next-free-slot
//!   suggestion
//! - [`store`] — the record-store boundary with an in-memory reference
//!   implementation
//! - [`series`] — create/update/delete orchestration for single slots and
//!   whole series
//! - [`error`] — error types

pub mod conflict;
pub mod error;
pub mod expander;
pub mod rule;
pub mod series;
pub mod slot;
pub mod store;

pub use conflict::{find_conflict, suggest_next_free, ConflictReport, FreeSlot};
pub use error::SlotError;
pub use expander::{expand_dates, expand_series, materialize_instances, MAX_OCCURRENCES};
pub use rule::{Frequency, RecurrenceRule};
pub use series::{
    SaveOptions, SeriesManager, SeriesWrite, CONFLICT_PRECHECK_HORIZON_DAYS,
    DEFAULT_SERIES_HORIZON_DAYS,
};
pub use slot::{ClockTime, SlotId, SlotKind, TimeSlot, MINUTES_PER_DAY};
pub use store::{BatchOp, MemoryStore, SlotStore};
