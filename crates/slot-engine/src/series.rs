//! Series management: create, update, and delete whole recurring series
//! versus single slots, keeping the parent/instance linkage consistent.
//!
//! The manager composes the pure pieces — [`crate::expander`] for
//! occurrence generation, [`crate::conflict`] for overlap vetting — with a
//! [`SlotStore`] for persistence. Validation and conflict failures surface
//! before anything is written; multi-record writes go through the store's
//! atomic batch so a reload can never observe half a series.

use chrono::{Duration, NaiveDate};

use crate::conflict::{find_conflict, suggest_next_free, FreeSlot};
use crate::error::{Result, SlotError};
use crate::expander::{expand_dates, materialize_instances};
use crate::rule::RecurrenceRule;
use crate::slot::{SlotId, SlotKind, TimeSlot};
use crate::store::{BatchOp, SlotStore};

/// How far past the anchor a new series is materialized (one year).
pub const DEFAULT_SERIES_HORIZON_DAYS: i64 = 365;

/// Horizon for conflict pre-checks that do not persist anything (three
/// months).
pub const CONFLICT_PRECHECK_HORIZON_DAYS: i64 = 90;

/// Caller-supplied save behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    /// Skip conflict detection entirely. The only sanctioned way to
    /// persist overlapping slots; validation still applies.
    pub force: bool,
}

impl SaveOptions {
    /// Options with the force-save escape hatch enabled.
    #[must_use]
    pub fn forced() -> Self {
        SaveOptions { force: true }
    }
}

/// Ids assigned when a series is created or rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesWrite {
    pub parent_id: SlotId,
    pub instance_ids: Vec<SlotId>,
}

/// Orchestrates expansion, conflict detection, and persistence for the
/// daily planner's slots.
#[derive(Debug)]
pub struct SeriesManager<S: SlotStore> {
    store: S,
}

impl<S: SlotStore> SeriesManager<S> {
    pub fn new(store: S) -> Self {
        SeriesManager { store }
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the store back, e.g. for host-side serialization.
    pub fn into_store(self) -> S {
        self.store
    }

    // ── create ──────────────────────────────────────────────────────────

    /// Persist a single non-recurring slot.
    ///
    /// # Errors
    ///
    /// [`SlotError::Validation`] for an empty title, inverted time range,
    /// or a non-standalone `kind`; [`SlotError::Conflict`] if the range
    /// overlaps an existing slot and `force` is off.
    pub fn create_slot(&mut self, slot: TimeSlot, options: SaveOptions) -> Result<SlotId> {
        if slot.kind != SlotKind::Standalone {
            return Err(SlotError::Validation(
                "create_slot only persists standalone slots; use create_series".to_string(),
            ));
        }
        validate_fields(&slot)?;
        if !options.force {
            self.ensure_date_free(slot.date, &slot, None)?;
        }
        self.store.insert(slot)
    }

    /// Persist a recurring series: the anchor as parent plus every
    /// instance out to the default one-year horizon.
    ///
    /// All conflict checks run before anything is written, so a conflict
    /// aborts with no partial state. On success the parent is inserted
    /// first (to obtain its id) and all instances follow in one atomic
    /// batch.
    ///
    /// # Errors
    ///
    /// [`SlotError::Validation`], [`SlotError::Conflict`] as for
    /// [`Self::create_slot`]; [`SlotError::Integrity`] if the instance
    /// batch fails after the parent row was written.
    pub fn create_series(
        &mut self,
        anchor: TimeSlot,
        rule: RecurrenceRule,
        options: SaveOptions,
    ) -> Result<SeriesWrite> {
        let horizon = anchor.date + Duration::days(DEFAULT_SERIES_HORIZON_DAYS);
        self.create_series_until(anchor, rule, horizon, options)
    }

    /// [`Self::create_series`] with an explicit materialization horizon.
    pub fn create_series_until(
        &mut self,
        anchor: TimeSlot,
        rule: RecurrenceRule,
        horizon: NaiveDate,
        options: SaveOptions,
    ) -> Result<SeriesWrite> {
        if anchor.kind != SlotKind::Standalone {
            return Err(SlotError::Validation(
                "series anchor must be passed as a plain slot; the manager tags it".to_string(),
            ));
        }
        validate_fields(&anchor)?;
        let dates = expand_dates(anchor.date, &rule, horizon)?;

        if !options.force {
            self.ensure_date_free(anchor.date, &anchor, None)?;
            for &date in &dates {
                self.ensure_date_free(date, &anchor, None)?;
            }
        }

        let mut parent = anchor.clone();
        parent.kind = SlotKind::SeriesParent(rule);
        let parent_id = self.store.insert(parent)?;

        let instances = materialize_instances(&anchor, parent_id, &dates);
        let ops = instances.into_iter().map(BatchOp::Insert).collect();
        let instance_ids = self.store.apply_batch(ops).map_err(|e| {
            SlotError::Integrity(format!(
                "parent {parent_id} was written but its instance batch failed: {e}"
            ))
        })?;

        Ok(SeriesWrite {
            parent_id,
            instance_ids,
        })
    }

    /// Vet a prospective series against the calendar without persisting
    /// anything, over the shorter three-month pre-check horizon.
    ///
    /// # Errors
    ///
    /// [`SlotError::Conflict`] describing the first collision, or
    /// [`SlotError::Validation`] for bad input.
    pub fn precheck_series(&self, anchor: &TimeSlot, rule: &RecurrenceRule) -> Result<()> {
        validate_fields(anchor)?;
        let horizon = anchor.date + Duration::days(CONFLICT_PRECHECK_HORIZON_DAYS);
        self.ensure_date_free(anchor.date, anchor, None)?;
        for date in expand_dates(anchor.date, rule, horizon)? {
            self.ensure_date_free(date, anchor, None)?;
        }
        Ok(())
    }

    // ── update ──────────────────────────────────────────────────────────

    /// Update a single record in place: a standalone slot or one instance
    /// of a series. Returns `Ok(false)` if the record no longer exists
    /// (deleted from another view) — a warned no-op, not an error.
    ///
    /// # Errors
    ///
    /// [`SlotError::Validation`] for bad fields, an unsaved slot, or a
    /// series parent (parents go through [`Self::update_series`]);
    /// [`SlotError::Conflict`] on overlap without `force`.
    pub fn update_slot(&mut self, slot: &TimeSlot, options: SaveOptions) -> Result<bool> {
        let Some(id) = slot.id else {
            return Err(SlotError::Validation(
                "cannot update a slot that was never saved".to_string(),
            ));
        };
        if slot.kind.is_parent() {
            return Err(SlotError::Validation(
                "series parents are updated through update_series".to_string(),
            ));
        }
        validate_fields(slot)?;
        if !options.force {
            self.ensure_date_free(slot.date, slot, Some(id))?;
        }
        self.store.update(slot)
    }

    /// Update a series parent and rebuild its instances from the (possibly
    /// changed) rule: delete every old instance and insert the regenerated
    /// set, together with the parent update, as one atomic batch.
    ///
    /// # Errors
    ///
    /// [`SlotError::Validation`] if the slot is not a saved series parent
    /// or fails field/rule validation; [`SlotError::Conflict`] if a
    /// regenerated occurrence overlaps anything outside this series and
    /// `force` is off; [`SlotError::Storage`] if the batch fails (in which
    /// case nothing changed).
    pub fn update_series(&mut self, parent: &TimeSlot, options: SaveOptions) -> Result<SeriesWrite> {
        let Some(parent_id) = parent.id else {
            return Err(SlotError::Validation(
                "cannot update a series that was never saved".to_string(),
            ));
        };
        let Some(rule) = parent.kind.rule() else {
            return Err(SlotError::Validation(
                "update_series expects a series parent".to_string(),
            ));
        };
        validate_fields(parent)?;

        let horizon = parent.date + Duration::days(DEFAULT_SERIES_HORIZON_DAYS);
        let dates = expand_dates(parent.date, rule, horizon)?;

        if !options.force {
            // The series' own records are about to be replaced; only
            // outsiders count.
            self.ensure_date_free_outside_series(parent.date, parent, parent_id)?;
            for &date in &dates {
                self.ensure_date_free_outside_series(date, parent, parent_id)?;
            }
        }

        let old_instances = self.store.instances_of(parent_id)?;
        let mut ops = Vec::with_capacity(1 + old_instances.len() + dates.len());
        ops.push(BatchOp::Update(parent.clone()));
        ops.extend(
            old_instances
                .iter()
                .filter_map(|inst| inst.id)
                .map(BatchOp::Delete),
        );
        ops.extend(
            materialize_instances(parent, parent_id, &dates)
                .into_iter()
                .map(BatchOp::Insert),
        );

        let instance_ids = self.store.apply_batch(ops)?;
        Ok(SeriesWrite {
            parent_id,
            instance_ids,
        })
    }

    // ── delete ──────────────────────────────────────────────────────────

    /// Delete a slot, cascading over the whole series when given a parent.
    /// Returns the number of records removed; `0` means the id was already
    /// gone (a warned no-op).
    ///
    /// # Errors
    ///
    /// [`SlotError::Storage`] if the cascade batch fails; nothing is
    /// removed in that case.
    pub fn delete_slot(&mut self, id: SlotId) -> Result<usize> {
        let Some(slot) = self.store.get(id)? else {
            return Ok(0);
        };
        match slot.kind {
            SlotKind::Standalone | SlotKind::SeriesInstance { .. } => {
                Ok(usize::from(self.store.delete(id)?))
            }
            SlotKind::SeriesParent(_) => {
                let instances = self.store.instances_of(id)?;
                let mut ops: Vec<BatchOp> = instances
                    .iter()
                    .filter_map(|inst| inst.id)
                    .map(BatchOp::Delete)
                    .collect();
                let removed = ops.len() + 1;
                ops.push(BatchOp::Delete(id));
                self.store.apply_batch(ops)?;
                Ok(removed)
            }
        }
    }

    // ── queries ─────────────────────────────────────────────────────────

    /// All slots for a date, sorted by start time — the planner's day view.
    pub fn day_schedule(&self, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        let mut slots = self.store.slots_on(date)?;
        slots.sort_by_key(|slot| slot.start_time);
        Ok(slots)
    }

    /// The earliest free range of `duration_minutes` on a date, for
    /// "suggest next free time" remediation after a conflict.
    pub fn suggest_free(&self, date: NaiveDate, duration_minutes: u16) -> Result<Option<FreeSlot>> {
        let existing = self.store.slots_on(date)?;
        Ok(suggest_next_free(duration_minutes, &existing))
    }

    /// Scan for instances whose parent is missing or is not a parent — the
    /// signature of a partially applied write by a store without real
    /// batches. Detection only; repair is the host's call.
    ///
    /// # Errors
    ///
    /// [`SlotError::Integrity`] naming the orphaned records.
    pub fn check_integrity(&self) -> Result<()> {
        let all = self.store.all_slots()?;
        let mut orphans = Vec::new();
        for slot in &all {
            if let SlotKind::SeriesInstance { parent_id } = slot.kind {
                let parent_ok = all
                    .iter()
                    .any(|p| p.id == Some(parent_id) && p.kind.is_parent());
                if !parent_ok {
                    orphans.push(format!(
                        "instance {} references missing parent {parent_id}",
                        slot.id.map_or_else(|| "?".to_string(), |id| id.to_string())
                    ));
                }
            }
        }
        if orphans.is_empty() {
            Ok(())
        } else {
            Err(SlotError::Integrity(orphans.join("; ")))
        }
    }

    // ── internal ────────────────────────────────────────────────────────

    fn ensure_date_free(
        &self,
        date: NaiveDate,
        candidate: &TimeSlot,
        exclude: Option<SlotId>,
    ) -> Result<()> {
        let existing = self.store.slots_on(date)?;
        match find_conflict(candidate.start_time, candidate.end_time, &existing, exclude)? {
            Some(report) => Err(SlotError::Conflict(report)),
            None => Ok(()),
        }
    }

    fn ensure_date_free_outside_series(
        &self,
        date: NaiveDate,
        candidate: &TimeSlot,
        series: SlotId,
    ) -> Result<()> {
        let mut existing = self.store.slots_on(date)?;
        existing.retain(|slot| slot.id != Some(series) && slot.kind.parent_id() != Some(series));
        match find_conflict(candidate.start_time, candidate.end_time, &existing, None)? {
            Some(report) => Err(SlotError::Conflict(report)),
            None => Ok(()),
        }
    }
}

/// Shared field validation for every save path.
fn validate_fields(slot: &TimeSlot) -> Result<()> {
    if slot.title.trim().is_empty() {
        return Err(SlotError::Validation("title must not be empty".to_string()));
    }
    if slot.end_time <= slot.start_time {
        return Err(SlotError::Validation(
            "end time must be after start time".to_string(),
        ));
    }
    Ok(())
}
