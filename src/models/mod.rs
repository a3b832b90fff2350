//! Core data models for the document store.
//!
//! `Document` maps to the single database table via `sqlx::FromRow` and
//! serializes as camelCase JSON on the API surface.

pub mod document;
pub mod stats;
