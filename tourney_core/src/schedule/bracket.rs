//! Single-elimination bracket generation.

use chrono::{DateTime, Utc};

use super::models::{NewMatch, Stage};
use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::tournament::TeamId;

/// Final
pub const FINAL_LABEL: &str = "결승";

/// Semi-final
pub const SEMI_FINAL_LABEL: &str = "준결승";

/// Default round name for manually entered pairings
pub const MANUAL_ROUND_LABEL: &str = "1라운드";

/// Smallest power of two holding `team_count` teams, at least 2
pub fn round_size(team_count: usize) -> usize {
    team_count.max(2).next_power_of_two()
}

/// Round label for a round of `size` slots
pub fn round_label(size: usize) -> String {
    match size {
        2 => FINAL_LABEL.to_string(),
        4 => SEMI_FINAL_LABEL.to_string(),
        n => format!("{n}강"),
    }
}

/// Generate one bracket round
///
/// Pairs `teams[2i]` with `teams[2i + 1]` across `round_size / 2` matches. A slot
/// without an opponent is a bye; a slot without any team resolves empty. Matches
/// are spaced by the bracket interval starting at `base`.
///
/// # Errors
///
/// * `EngineError::InsufficientTeams` - Fewer than two teams
pub fn generate_bracket(
    teams: &[TeamId],
    stage: Stage,
    base: DateTime<Utc>,
    config: &EngineConfig,
) -> EngineResult<Vec<NewMatch>> {
    if teams.len() < 2 {
        return Err(EngineError::InsufficientTeams {
            needed: 2,
            current: teams.len(),
        });
    }

    let size = round_size(teams.len());
    let label = round_label(size);
    let interval = config.bracket_interval();

    let matches = (0..size / 2)
        .map(|i| {
            let team_a = teams.get(2 * i).copied();
            let team_b = teams.get(2 * i + 1).copied();
            let at = base + interval * i as i32;
            NewMatch::pairing(stage, label.clone(), team_a, team_b, at)
        })
        .collect();

    Ok(matches)
}
