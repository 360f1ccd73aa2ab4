//! Domain model for daily routines.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own the per-slot transition rule shared by every routine slot.
//!
//! # Invariants
//! - Every routine record is identified by a stable `RoutineId`.
//! - `(user_id, date)` identifies at most one record.
//! - Slot content is editable only while the slot is `pending`.

pub mod routine;
