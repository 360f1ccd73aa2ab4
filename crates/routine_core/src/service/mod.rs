//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep FFI/CLI layers decoupled from storage details.

mod entry_store;
pub mod journal_service;
pub mod mood_service;
pub mod routine_service;

pub use entry_store::{EntryResult, EntryServiceError};
