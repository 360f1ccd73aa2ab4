//! FRB bindings for the routine core.

pub mod api;
