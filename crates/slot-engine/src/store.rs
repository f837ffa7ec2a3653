//! The record-store boundary the engine persists through.
//!
//! The engine never talks to a concrete database; it sees only the
//! [`SlotStore`] trait — create, read, field queries, update, delete, and
//! an all-or-nothing batch. [`MemoryStore`] is the reference
//! implementation, used by the test suite and suitable for a host that
//! serializes the whole map itself.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::{Result, SlotError};
use crate::slot::{SlotId, TimeSlot};

/// One operation inside an atomic batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Insert an unsaved slot; the store assigns its id.
    Insert(TimeSlot),
    /// Replace the record whose id matches `slot.id`.
    Update(TimeSlot),
    /// Remove a record by id.
    Delete(SlotId),
}

/// Persistence boundary for slot records.
///
/// `update` and `delete` return `Ok(false)` when the id is missing — a
/// record deleted from another view is a warned no-op, never a crash.
pub trait SlotStore {
    /// Persist an unsaved slot and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Storage`] if the slot already carries an id.
    fn insert(&mut self, slot: TimeSlot) -> Result<SlotId>;

    /// Fetch one record by id.
    fn get(&self, id: SlotId) -> Result<Option<TimeSlot>>;

    /// All slots dated exactly `date`, in insertion (id) order.
    fn slots_on(&self, date: NaiveDate) -> Result<Vec<TimeSlot>>;

    /// All slots dated within `[start, end]` inclusive.
    fn slots_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TimeSlot>>;

    /// All instances whose parent id equals `parent`.
    fn instances_of(&self, parent: SlotId) -> Result<Vec<TimeSlot>>;

    /// Every persisted slot. Local stores are small; the integrity scan
    /// relies on this.
    fn all_slots(&self) -> Result<Vec<TimeSlot>>;

    /// Replace the record at `slot.id`. `Ok(false)` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Storage`] if the slot has no id.
    fn update(&mut self, slot: &TimeSlot) -> Result<bool>;

    /// Remove a record. `Ok(false)` if absent.
    fn delete(&mut self, id: SlotId) -> Result<bool>;

    /// Apply every operation or none of them, returning the ids assigned
    /// to inserts in order.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Storage`] if any operation is malformed or
    /// references a missing record; in that case nothing is applied.
    fn apply_batch(&mut self, ops: Vec<BatchOp>) -> Result<Vec<SlotId>>;
}

// ── MemoryStore ─────────────────────────────────────────────────────────────

/// In-memory reference store with auto-incrementing ids.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    slots: BTreeMap<SlotId, TimeSlot>,
    next_id: SlotId,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        MemoryStore {
            slots: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Number of persisted records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn insert_into(
        slots: &mut BTreeMap<SlotId, TimeSlot>,
        next_id: &mut SlotId,
        mut slot: TimeSlot,
    ) -> Result<SlotId> {
        if let Some(id) = slot.id {
            return Err(SlotError::Storage(format!(
                "cannot insert slot that already has id {id}"
            )));
        }
        let id = *next_id;
        *next_id += 1;
        slot.id = Some(id);
        slots.insert(id, slot);
        Ok(id)
    }
}

impl SlotStore for MemoryStore {
    fn insert(&mut self, slot: TimeSlot) -> Result<SlotId> {
        Self::insert_into(&mut self.slots, &mut self.next_id, slot)
    }

    fn get(&self, id: SlotId) -> Result<Option<TimeSlot>> {
        Ok(self.slots.get(&id).cloned())
    }

    fn slots_on(&self, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        Ok(self
            .slots
            .values()
            .filter(|slot| slot.date == date)
            .cloned()
            .collect())
    }

    fn slots_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TimeSlot>> {
        Ok(self
            .slots
            .values()
            .filter(|slot| slot.date >= start && slot.date <= end)
            .cloned()
            .collect())
    }

    fn instances_of(&self, parent: SlotId) -> Result<Vec<TimeSlot>> {
        Ok(self
            .slots
            .values()
            .filter(|slot| slot.kind.parent_id() == Some(parent))
            .cloned()
            .collect())
    }

    fn all_slots(&self) -> Result<Vec<TimeSlot>> {
        Ok(self.slots.values().cloned().collect())
    }

    fn update(&mut self, slot: &TimeSlot) -> Result<bool> {
        let Some(id) = slot.id else {
            return Err(SlotError::Storage(
                "cannot update a slot that was never inserted".to_string(),
            ));
        };
        if !self.slots.contains_key(&id) {
            return Ok(false);
        }
        self.slots.insert(id, slot.clone());
        Ok(true)
    }

    fn delete(&mut self, id: SlotId) -> Result<bool> {
        Ok(self.slots.remove(&id).is_some())
    }

    fn apply_batch(&mut self, ops: Vec<BatchOp>) -> Result<Vec<SlotId>> {
        // Stage against a copy; swap in only if every operation applies.
        let mut staged = self.slots.clone();
        let mut staged_next = self.next_id;
        let mut inserted = Vec::new();

        for op in ops {
            match op {
                BatchOp::Insert(slot) => {
                    inserted.push(Self::insert_into(&mut staged, &mut staged_next, slot)?);
                }
                BatchOp::Update(slot) => {
                    let Some(id) = slot.id else {
                        return Err(SlotError::Storage(
                            "batch update on a slot that was never inserted".to_string(),
                        ));
                    };
                    if !staged.contains_key(&id) {
                        return Err(SlotError::Storage(format!(
                            "batch update references missing record {id}"
                        )));
                    }
                    staged.insert(id, slot);
                }
                BatchOp::Delete(id) => {
                    if staged.remove(&id).is_none() {
                        return Err(SlotError::Storage(format!(
                            "batch delete references missing record {id}"
                        )));
                    }
                }
            }
        }

        self.slots = staged;
        self.next_id = staged_next;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::ClockTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft(title: &str, day: u32) -> TimeSlot {
        TimeSlot::new(
            title,
            date(2026, 3, day),
            "09:00".parse::<ClockTime>().unwrap(),
            "10:00".parse::<ClockTime>().unwrap(),
        )
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let mut store = MemoryStore::new();
        let a = store.insert(draft("A", 2)).unwrap();
        let b = store.insert(draft("B", 2)).unwrap();
        assert!(b > a);
        assert_eq!(store.get(a).unwrap().unwrap().title, "A");
        assert_eq!(store.get(a).unwrap().unwrap().id, Some(a));
    }

    #[test]
    fn test_insert_rejects_slot_with_id() {
        let mut store = MemoryStore::new();
        let mut slot = draft("A", 2);
        slot.id = Some(99);
        assert!(store.insert(slot).is_err());
    }

    #[test]
    fn test_query_by_date_and_range() {
        let mut store = MemoryStore::new();
        store.insert(draft("A", 2)).unwrap();
        store.insert(draft("B", 2)).unwrap();
        store.insert(draft("C", 5)).unwrap();

        assert_eq!(store.slots_on(date(2026, 3, 2)).unwrap().len(), 2);
        assert_eq!(store.slots_on(date(2026, 3, 4)).unwrap().len(), 0);
        assert_eq!(
            store
                .slots_in_range(date(2026, 3, 2), date(2026, 3, 5))
                .unwrap()
                .len(),
            3
        );
        assert_eq!(
            store
                .slots_in_range(date(2026, 3, 3), date(2026, 3, 4))
                .unwrap()
                .len(),
            0
        );
    }

    #[test]
    fn test_update_and_delete_missing_are_no_ops() {
        let mut store = MemoryStore::new();
        let mut ghost = draft("Ghost", 2);
        ghost.id = Some(404);
        assert!(!store.update(&ghost).unwrap());
        assert!(!store.delete(404).unwrap());
    }

    #[test]
    fn test_update_replaces_record() {
        let mut store = MemoryStore::new();
        let id = store.insert(draft("Before", 2)).unwrap();
        let mut slot = store.get(id).unwrap().unwrap();
        slot.title = "After".to_string();
        assert!(store.update(&slot).unwrap());
        assert_eq!(store.get(id).unwrap().unwrap().title, "After");
    }

    #[test]
    fn test_batch_applies_all_operations() {
        let mut store = MemoryStore::new();
        let keep = store.insert(draft("Keep", 2)).unwrap();
        let gone = store.insert(draft("Drop", 2)).unwrap();

        let ids = store
            .apply_batch(vec![
                BatchOp::Insert(draft("New", 3)),
                BatchOp::Delete(gone),
            ])
            .unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.len(), 2);
        assert!(store.get(keep).unwrap().is_some());
        assert!(store.get(gone).unwrap().is_none());
        assert!(store.get(ids[0]).unwrap().is_some());
    }

    #[test]
    fn test_failed_batch_applies_nothing() {
        let mut store = MemoryStore::new();
        let existing = store.insert(draft("Existing", 2)).unwrap();

        let result = store.apply_batch(vec![
            BatchOp::Insert(draft("New", 3)),
            BatchOp::Delete(999), // missing: the whole batch must fail
        ]);
        assert!(result.is_err());
        assert_eq!(store.len(), 1);
        assert!(store.get(existing).unwrap().is_some());

        // A failed batch leaves the id counter untouched.
        let next = store.insert(draft("Later", 4)).unwrap();
        assert_eq!(next, existing + 1);
    }

    #[test]
    fn test_instances_of_filters_by_parent() {
        let mut store = MemoryStore::new();
        let parent = store.insert(draft("Parent", 2)).unwrap();
        let mut inst = draft("Inst", 3);
        inst.kind = crate::slot::SlotKind::SeriesInstance { parent_id: parent };
        store.insert(inst).unwrap();
        store.insert(draft("Other", 3)).unwrap();

        let instances = store.instances_of(parent).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].title, "Inst");
    }
}
