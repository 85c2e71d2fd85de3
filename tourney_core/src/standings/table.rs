//! League table computation.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::schedule::{Match, Stage};
use crate::tournament::TeamId;

/// Label of the fallback table when no league matches exist
pub const DEFAULT_TABLE_LABEL: &str = "리그";

/// Points for a win
pub const WIN_POINTS: u32 = 3;

/// Points for a draw
pub const DRAW_POINTS: u32 = 1;

/// Outcome of one match from a team's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormResult {
    W,
    D,
    L,
}

/// One team's line in a league table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingRow {
    pub team_id: TeamId,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: i64,
    pub goals_against: i64,
    pub points: u32,
    /// Results in match order
    pub recent_form: Vec<FormResult>,
}

impl StandingRow {
    pub fn new(team_id: TeamId) -> Self {
        Self {
            team_id,
            played: 0,
            won: 0,
            drawn: 0,
            lost: 0,
            goals_for: 0,
            goals_against: 0,
            points: 0,
            recent_form: Vec::new(),
        }
    }

    pub fn goal_difference(&self) -> i64 {
        self.goals_for - self.goals_against
    }

    fn record(&mut self, scored: i32, conceded: i32) {
        self.played += 1;
        self.goals_for += i64::from(scored);
        self.goals_against += i64::from(conceded);

        match scored.cmp(&conceded) {
            Ordering::Greater => {
                self.won += 1;
                self.points += WIN_POINTS;
                self.recent_form.push(FormResult::W);
            }
            Ordering::Equal => {
                self.drawn += 1;
                self.points += DRAW_POINTS;
                self.recent_form.push(FormResult::D);
            }
            Ordering::Less => {
                self.lost += 1;
                self.recent_form.push(FormResult::L);
            }
        }
    }
}

/// Ranking order: points, then goal difference, then goals scored, all descending
pub fn rank_order(a: &StandingRow, b: &StandingRow) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.goal_difference().cmp(&a.goal_difference()))
        .then_with(|| b.goals_for.cmp(&a.goals_for))
}

/// Compute a ranked table for `roster`
///
/// Only finished matches with a score where both teams are on the roster count.
/// Teams tied on every ranking key keep their roster order.
pub fn compute_standings(roster: &[TeamId], matches: &[Match]) -> Vec<StandingRow> {
    let mut rows: Vec<StandingRow> = roster.iter().map(|id| StandingRow::new(*id)).collect();
    let index: HashMap<TeamId, usize> = roster
        .iter()
        .enumerate()
        .map(|(position, id)| (*id, position))
        .collect();

    for m in matches {
        let (Some((a, b)), Some(score)) = (m.both_teams(), m.score()) else {
            continue;
        };
        let (Some(&ia), Some(&ib)) = (index.get(&a), index.get(&b)) else {
            continue;
        };

        rows[ia].record(score.team_a, score.team_b);
        rows[ib].record(score.team_b, score.team_a);
    }

    // Stable: ties keep roster order
    rows.sort_by(rank_order);
    rows
}

/// Teams of a group in order of first appearance
pub fn roster_by_appearance(matches: &[Match]) -> Vec<TeamId> {
    let mut roster = Vec::new();
    for m in matches {
        for team in [m.team_a, m.team_b].into_iter().flatten() {
            if !roster.contains(&team) {
                roster.push(team);
            }
        }
    }
    roster
}

/// Ranked table of one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStandings {
    pub group: String,
    pub rows: Vec<StandingRow>,
}

/// League matches grouped by round label, labels sorted, matches in creation order
pub fn group_league_matches(matches: &[Match]) -> BTreeMap<String, Vec<Match>> {
    let mut groups: BTreeMap<String, Vec<Match>> = BTreeMap::new();
    for m in matches.iter().filter(|m| m.stage == Stage::League) {
        groups.entry(m.round_name.clone()).or_default().push(m.clone());
    }
    for group in groups.values_mut() {
        group.sort_by_key(|m| m.id);
    }
    groups
}

/// One ranked table per league group
///
/// When there are no league matches, a single table over `fallback_roster`
/// labelled [`DEFAULT_TABLE_LABEL`] is returned.
pub fn league_tables(matches: &[Match], fallback_roster: &[TeamId]) -> Vec<GroupStandings> {
    let groups = group_league_matches(matches);
    if groups.is_empty() {
        return vec![GroupStandings {
            group: DEFAULT_TABLE_LABEL.to_string(),
            rows: compute_standings(fallback_roster, &[]),
        }];
    }

    groups
        .into_iter()
        .map(|(group, group_matches)| {
            let roster = roster_by_appearance(&group_matches);
            GroupStandings {
                rows: compute_standings(&roster, &group_matches),
                group,
            }
        })
        .collect()
}

/// Top `per_group` teams of each table, concatenated group by group
pub fn top_qualifiers(tables: &[GroupStandings], per_group: usize) -> Vec<TeamId> {
    tables
        .iter()
        .flat_map(|table| table.rows.iter().take(per_group).map(|row| row.team_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{MatchState, Score};
    use chrono::Utc;

    fn played(id: i64, group: &str, a: TeamId, b: TeamId, sa: i32, sb: i32) -> Match {
        let winner = match sa.cmp(&sb) {
            Ordering::Greater => Some(a),
            Ordering::Less => Some(b),
            Ordering::Equal => None,
        };
        Match {
            id,
            tournament_id: 1,
            stage: Stage::League,
            round_name: group.to_string(),
            team_a: Some(a),
            team_b: Some(b),
            scheduled_at: Utc::now(),
            state: MatchState::Done {
                score: Some(Score::new(sa, sb)),
                winner,
            },
        }
    }

    fn pending(id: i64, group: &str, a: TeamId, b: TeamId) -> Match {
        Match {
            state: MatchState::Upcoming,
            ..played(id, group, a, b, 0, 0)
        }
    }

    #[test]
    fn test_two_wins_rank_above_win_and_draw() {
        // A: 2W (6 pts, GD +3); B: 1W 1D (4 pts, GD +1)
        let matches = vec![
            played(1, "A조", 1, 3, 2, 0),
            played(2, "A조", 1, 4, 1, 0),
            played(3, "A조", 2, 3, 1, 0),
            played(4, "A조", 2, 4, 0, 0),
        ];
        let table = compute_standings(&[2, 1, 3, 4], &matches);

        assert_eq!(table[0].team_id, 1);
        assert_eq!(table[0].points, 6);
        assert_eq!(table[0].goal_difference(), 3);
        assert_eq!(table[1].team_id, 2);
        assert_eq!(table[1].points, 4);
        assert_eq!(table[1].goal_difference(), 1);
        assert_eq!(table[1].recent_form, vec![FormResult::W, FormResult::D]);
    }

    #[test]
    fn test_goals_for_breaks_goal_difference_tie() {
        let matches = vec![played(1, "A조", 1, 2, 3, 3), played(2, "A조", 3, 4, 1, 1)];
        let table = compute_standings(&[3, 4, 1, 2], &matches);
        let order: Vec<TeamId> = table.iter().map(|r| r.team_id).collect();
        assert_eq!(order, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_full_ties_keep_roster_order() {
        let matches = vec![played(1, "A조", 1, 2, 1, 1)];
        let table = compute_standings(&[2, 1], &matches);
        assert_eq!(table[0].team_id, 2);
        assert_eq!(table[1].team_id, 1);
    }

    #[test]
    fn test_pending_and_foreign_matches_ignored() {
        let matches = vec![pending(1, "A조", 1, 2), played(2, "A조", 1, 9, 5, 0)];
        let table = compute_standings(&[1, 2], &matches);
        assert!(table.iter().all(|r| r.played == 0));
    }

    #[test]
    fn test_league_tables_group_by_label() {
        let matches = vec![
            played(3, "B조", 2, 4, 0, 1),
            played(1, "A조", 1, 3, 2, 1),
            played(2, "A조", 3, 5, 0, 0),
        ];
        let tables = league_tables(&matches, &[]);

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].group, "A조");
        // roster order [1, 3, 5]; 5 drew with GD 0, 3 lost and drew
        let order: Vec<TeamId> = tables[0].rows.iter().map(|r| r.team_id).collect();
        assert_eq!(order, vec![1, 5, 3]);
        assert_eq!(tables[1].group, "B조");
        assert_eq!(tables[1].rows[0].team_id, 4);
    }

    #[test]
    fn test_league_tables_fallback() {
        let tables = league_tables(&[], &[7, 8]);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].group, DEFAULT_TABLE_LABEL);
        assert_eq!(tables[0].rows.len(), 2);
    }

    #[test]
    fn test_top_qualifiers_group_by_group() {
        let matches = vec![
            played(1, "A조", 1, 3, 0, 2),
            played(2, "B조", 2, 4, 3, 0),
        ];
        let tables = league_tables(&matches, &[]);
        assert_eq!(top_qualifiers(&tables, 1), vec![3, 2]);
        assert_eq!(top_qualifiers(&tables, 2), vec![3, 1, 2, 4]);
    }
}
