//! Points ledger.
//!
//! Every balance change made by the engine is paired with an append-only
//! ledger entry recording the resulting balance.

pub mod models;

pub use models::{EntryDirection, EntryType, PointsChange, PointsEntry, UserAccount};
