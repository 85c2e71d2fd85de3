//! Schedule generation.
//!
//! Pure functions that turn an ordered team list into matches: round-robin
//! leagues (single or grouped) and single-elimination bracket rounds, plus the
//! date policy that places them on the calendar.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use tourney_core::EngineConfig;
//! use tourney_core::schedule::{Stage, generate_bracket, round_label};
//!
//! let config = EngineConfig::default();
//! let round = generate_bracket(&[1, 2, 3], Stage::Tournament, Utc::now(), &config).unwrap();
//! assert_eq!(round.len(), 2);
//! assert_eq!(round[0].round_name, round_label(4));
//! assert!(round[1].is_bye());
//! ```

pub mod bracket;
pub mod league;
pub mod models;
pub mod shuffle;
pub mod window;

pub use bracket::{
    FINAL_LABEL, MANUAL_ROUND_LABEL, SEMI_FINAL_LABEL, generate_bracket, round_label, round_size,
};
pub use league::{SINGLE_LEAGUE_LABEL, assign_groups, generate_league_schedule, group_label};
pub use models::{Match, MatchId, MatchState, NewMatch, Score, Stage};
pub use shuffle::{TeamShuffler, generate_invite_code, shuffle_teams};
pub use window::DateWindow;
