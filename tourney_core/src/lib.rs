//! # Tourney Core
//!
//! A tournament progression engine for amateur sports competitions.
//!
//! Tournaments are run in one of three formats, and the engine owns everything
//! between "teams have signed up" and "a champion is crowned":
//!
//! - **Tournament**: single-elimination bracket with byes
//! - **League**: round-robin, optionally split into groups
//! - **Hybrid**: round-robin groups, then a playoff bracket of the top teams
//!
//! Reported results advance the bracket automatically, and every result settles
//! the point bets placed on the match with pari-mutuel odds.
//!
//! ## Core Modules
//!
//! - [`tournament`]: Lifecycle state machine, result reporting and advancement
//! - [`schedule`]: League and bracket generation, date policy
//! - [`standings`]: League tables and tie-break ordering
//! - [`prediction`]: Point-betting, pools and settlement
//! - [`db`]: Transactional persistence gateway (PostgreSQL or in-memory)
//!
//! ## Example
//!
//! ```
//! use tourney_core::schedule::{round_label, round_size};
//!
//! // Five teams need an eight-slot first round
//! assert_eq!(round_size(5), 8);
//! assert_eq!(round_label(round_size(5)), "8강");
//! ```

pub mod clock;
pub mod config;
pub mod db;
pub mod errors;
pub mod points;
pub mod prediction;
pub mod schedule;
pub mod standings;

/// Tournament lifecycle and progression.
pub mod tournament;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use db::{Database, DatabaseConfig, MemoryStore, PgStore, Store, StoreTx};
pub use errors::{EngineError, EngineResult, ErrorKind};
pub use prediction::PredictionManager;
pub use tournament::TournamentManager;
