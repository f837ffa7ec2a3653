//! Error types for slot-engine operations.

use thiserror::Error;

use crate::conflict::ConflictReport;

#[derive(Error, Debug)]
pub enum SlotError {
    /// Invalid user input: empty title, end time not after start time,
    /// malformed recurrence rule. Nothing is persisted.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A candidate occurrence overlaps an already-persisted slot. Carries
    /// the conflicting record's identity so the caller can offer
    /// remediation (force-save, delete the other slot, or move the time).
    #[error("Scheduling conflict: {0}")]
    Conflict(ConflictReport),

    /// The store is in a state no complete operation could have produced
    /// (orphaned instances, a parent write whose instance batch failed).
    /// Aborts the operation; the caller must re-fetch before retrying.
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// The underlying record store rejected an operation.
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, SlotError>;
