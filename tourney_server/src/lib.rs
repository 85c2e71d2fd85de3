//! HTTP surface for the tournament progression engine.
//!
//! The binary wires a PostgreSQL-backed [`tourney_core::TournamentManager`] and
//! [`tourney_core::PredictionManager`] into an axum router; tests drive the same
//! router over the in-memory store.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
