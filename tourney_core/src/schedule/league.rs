//! Round-robin league schedule.

use super::{
    models::{NewMatch, Stage},
    window::{DateWindow, pin_to_match_hour},
};
use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::tournament::{MAX_GROUPS, TeamId};

/// Round label of an ungrouped league
pub const SINGLE_LEAGUE_LABEL: &str = "League Round";

/// Label of the `index`-th group: "A조", "B조", ...
pub fn group_label(index: usize) -> String {
    let letter = (b'A' + (index % MAX_GROUPS as usize) as u8) as char;
    format!("{letter}조")
}

/// Split teams into groups; team `k` joins group `k mod group_count`
pub fn assign_groups(teams: &[TeamId], group_count: usize) -> Vec<(String, Vec<TeamId>)> {
    let group_count = group_count.max(1);
    let mut groups: Vec<(String, Vec<TeamId>)> = (0..group_count)
        .map(|index| (group_label(index), Vec::new()))
        .collect();

    for (k, team) in teams.iter().enumerate() {
        groups[k % group_count].1.push(*team);
    }

    groups
}

/// Every unordered pair `(i < j)`, in index order
pub fn round_robin_pairs(teams: &[TeamId]) -> Vec<(TeamId, TeamId)> {
    let mut pairs = Vec::with_capacity(teams.len() * teams.len().saturating_sub(1) / 2);
    for i in 0..teams.len() {
        for j in (i + 1)..teams.len() {
            pairs.push((teams[i], teams[j]));
        }
    }
    pairs
}

/// Generate the league phase
///
/// With `group_count` of one or less the whole field plays one round-robin
/// labelled [`SINGLE_LEAGUE_LABEL`]; otherwise each group plays its own. Match
/// dates are spread linearly across `window` in generation order, pinned to the
/// match hour.
///
/// # Errors
///
/// * `EngineError::InsufficientTeams` - Fewer than two teams, or a group would have fewer than two
pub fn generate_league_schedule(
    teams: &[TeamId],
    group_count: Option<u32>,
    window: &DateWindow,
    config: &EngineConfig,
) -> EngineResult<Vec<NewMatch>> {
    if teams.len() < 2 {
        return Err(EngineError::InsufficientTeams {
            needed: 2,
            current: teams.len(),
        });
    }

    let group_count = group_count.unwrap_or(1).max(1) as usize;
    let groups = if group_count > 1 {
        if teams.len() < group_count * 2 {
            return Err(EngineError::InsufficientTeams {
                needed: group_count * 2,
                current: teams.len(),
            });
        }
        assign_groups(teams, group_count)
    } else {
        vec![(SINGLE_LEAGUE_LABEL.to_string(), teams.to_vec())]
    };

    let fixtures: Vec<(String, TeamId, TeamId)> = groups
        .iter()
        .flat_map(|(label, members)| {
            round_robin_pairs(members)
                .into_iter()
                .map(move |(a, b)| (label.clone(), a, b))
        })
        .collect();

    let total = fixtures.len();
    let matches = fixtures
        .into_iter()
        .enumerate()
        .map(|(index, (label, a, b))| {
            let at = pin_to_match_hour(window.slot(index, total), config);
            NewMatch::pairing(Stage::League, label, Some(a), Some(b), at)
        })
        .collect();

    Ok(matches)
}
