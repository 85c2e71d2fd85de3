/// Property-based tests for schedule generation
///
/// Brackets must seat every team exactly once, and league schedules must pair
/// every group member with every other exactly once inside the date window.
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use tourney_core::EngineConfig;
use tourney_core::schedule::{
    DateWindow, MatchState, SINGLE_LEAGUE_LABEL, Stage, TeamShuffler, generate_bracket,
    generate_league_schedule, round_label, round_size,
};
use tourney_core::tournament::TeamId;

// Strategy to generate a list of distinct team ids
fn teams_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<TeamId>> {
    prop::collection::btree_set(1i64..10_000, min..=max)
        .prop_map(|set| set.into_iter().collect())
}

fn window(days: i64) -> DateWindow {
    let start = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
    DateWindow {
        start,
        end: start + Duration::days(days),
    }
}

proptest! {
    #[test]
    fn test_bracket_seats_every_team_once(teams in teams_strategy(2, 64)) {
        let config = EngineConfig::default();
        let base = Utc.with_ymd_and_hms(2025, 9, 2, 9, 0, 0).unwrap();
        let matches = generate_bracket(&teams, Stage::Tournament, base, &config).unwrap();

        let size = round_size(teams.len());
        prop_assert_eq!(matches.len(), size / 2);
        prop_assert!(size >= teams.len() && size < teams.len() * 2);

        let seated: Vec<TeamId> = matches
            .iter()
            .flat_map(|m| m.team_a.into_iter().chain(m.team_b))
            .collect();
        prop_assert_eq!(&seated, &teams);

        let label = round_label(size);
        for m in &matches {
            prop_assert_eq!(&m.round_name, &label);
            prop_assert!(m.scheduled_at >= base);
            match (m.team_a, m.team_b) {
                (Some(_), Some(_)) => prop_assert_eq!(m.state, MatchState::Upcoming),
                (Some(sole), None) => prop_assert_eq!(
                    m.state,
                    MatchState::Done { score: None, winner: Some(sole) }
                ),
                _ => prop_assert_eq!(m.state, MatchState::Done { score: None, winner: None }),
            }
        }
        // Spaced by the bracket interval
        for pair in matches.windows(2) {
            prop_assert_eq!(pair[1].scheduled_at - pair[0].scheduled_at, config.bracket_interval());
        }
    }

    #[test]
    fn test_single_league_pairs_everyone_once(teams in teams_strategy(2, 20), days in 1i64..30) {
        let config = EngineConfig::default();
        let window = window(days);
        let matches = generate_league_schedule(&teams, None, &window, &config).unwrap();

        let n = teams.len();
        prop_assert_eq!(matches.len(), n * (n - 1) / 2);

        let pairs: BTreeSet<(TeamId, TeamId)> = matches
            .iter()
            .map(|m| {
                let (a, b) = (m.team_a.unwrap(), m.team_b.unwrap());
                (a.min(b), a.max(b))
            })
            .collect();
        prop_assert_eq!(pairs.len(), matches.len());

        for m in &matches {
            prop_assert_eq!(m.stage, Stage::League);
            prop_assert_eq!(m.round_name.as_str(), SINGLE_LEAGUE_LABEL);
            prop_assert_eq!(m.state, MatchState::Upcoming);
            // Pinned to the match hour on a day inside the window
            prop_assert!(m.scheduled_at >= window.start - Duration::days(1));
            prop_assert!(m.scheduled_at <= window.end + Duration::days(1));
        }
        for pair in matches.windows(2) {
            prop_assert!(pair[0].scheduled_at <= pair[1].scheduled_at);
        }
    }

    #[test]
    fn test_grouped_league_stays_inside_groups(teams in teams_strategy(4, 40), groups in 2u32..=4) {
        prop_assume!(teams.len() >= groups as usize * 2);
        let config = EngineConfig::default();
        let matches = generate_league_schedule(&teams, Some(groups), &window(7), &config).unwrap();

        let mut membership: HashMap<TeamId, &str> = HashMap::new();
        for m in &matches {
            for team in [m.team_a.unwrap(), m.team_b.unwrap()] {
                let group = membership.entry(team).or_insert(m.round_name.as_str());
                prop_assert_eq!(*group, m.round_name.as_str());
            }
        }
        prop_assert_eq!(membership.len(), teams.len());

        let labels: BTreeSet<&str> = membership.values().copied().collect();
        prop_assert_eq!(labels.len(), groups as usize);

        // Group sizes differ by at most one
        let mut sizes: HashMap<&str, usize> = HashMap::new();
        for group in membership.values() {
            *sizes.entry(*group).or_default() += 1;
        }
        let max = sizes.values().max().copied().unwrap_or(0);
        let min = sizes.values().min().copied().unwrap_or(0);
        prop_assert!(max - min <= 1);

        let expected: usize = sizes.values().map(|k| k * (k - 1) / 2).sum();
        prop_assert_eq!(matches.len(), expected);
    }

    #[test]
    fn test_shuffle_is_a_permutation(teams in teams_strategy(0, 50)) {
        let mut shuffled = teams.clone();
        TeamShuffler::new().shuffle(&mut shuffled);
        shuffled.sort_unstable();
        prop_assert_eq!(shuffled, teams);
    }
}

#[test]
fn test_too_few_teams_for_groups() {
    let config = EngineConfig::default();
    assert!(generate_league_schedule(&[1, 2, 3], Some(2), &window(7), &config).is_err());
    assert!(generate_bracket(&[1], Stage::Tournament, Utc::now(), &config).is_err());
}
