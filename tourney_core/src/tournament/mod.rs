//! Tournament lifecycle.
//!
//! A tournament moves RECRUITING → (UPCOMING) → ONGOING → ENDED. Teams apply
//! while it recruits and the manager approves them; starting it shuffles the
//! approved teams into a bracket or league schedule, and reported results
//! drive the bracket forward until a champion remains.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tourney_core::tournament::{NewTournament, Sport, TournamentManager};
//! use tourney_core::{EngineConfig, MemoryStore, SystemClock};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::new();
//!     let manager_id = store.add_user("host", 0).await;
//!     let manager = TournamentManager::new(
//!         Arc::new(store),
//!         Arc::new(SystemClock),
//!         EngineConfig::default(),
//!     );
//!
//!     let cup = manager
//!         .create_tournament(manager_id, NewTournament::new("Summer Cup", Sport::Soccer))
//!         .await?;
//!     println!("Created tournament: {}", cup.id);
//!     Ok(())
//! }
//! ```

pub mod manager;
pub mod models;
pub mod progression;

pub use manager::{
    BracketRound, LeagueStandings, PlayoffOutcome, ResultOutcome, StartOutcome, TournamentManager,
};
pub use models::{
    BracketGeneration, MAX_GROUPS, ManualPairing, NewTournament, Participant, ParticipantDetail,
    ParticipantStatus, Sport, Team, TeamId, Tournament, TournamentDetail, TournamentFilter,
    TournamentFormat, TournamentId, TournamentPhase, TournamentSettings, TournamentStatus,
    TournamentSummary, UserId,
};
pub use progression::{Advancement, advance_round};
