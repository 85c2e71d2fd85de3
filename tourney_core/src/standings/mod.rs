//! League standings.
//!
//! Aggregates finished league matches into per-team records and ranks them
//! by points, goal difference and goals scored.

pub mod table;

pub use table::{
    DEFAULT_TABLE_LABEL, FormResult, GroupStandings, StandingRow, compute_standings,
    group_league_matches, league_tables, rank_order, roster_by_appearance, top_qualifiers,
};
