//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Routine writes must enforce `DailyRoutineRecord::validate()` before
//!   persistence.
//! - Routine replacement is conditional on the caller's expected version.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.

pub mod kv_repo;
pub mod routine_repo;
