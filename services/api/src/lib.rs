//! services/api/src/lib.rs
//!
//! The HTTP shell around `results_portal_core`: configuration, the Postgres and
//! spreadsheet adapters, and the Axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
