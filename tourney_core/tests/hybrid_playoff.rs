//! League and hybrid tournaments: group schedules, standings, the playoff
//! cutover and league completion.

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use tourney_core::schedule::{Match, Stage};
use tourney_core::tournament::{
    NewTournament, Sport, TeamId, TournamentFormat, TournamentId, TournamentStatus, UserId,
};
use tourney_core::{
    EngineConfig, EngineError, ErrorKind, FixedClock, MemoryStore, Store, TournamentManager,
};

struct Harness {
    store: MemoryStore,
    manager: TournamentManager,
    host: UserId,
}

async fn harness() -> Harness {
    let store = MemoryStore::new();
    let host = store.add_user("host", 0).await;
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 5, 10, 0, 0, 0).unwrap(),
    ));
    let shared: Arc<dyn Store> = Arc::new(store.clone());
    Harness {
        manager: TournamentManager::new(shared, clock, EngineConfig::default()),
        store,
        host,
    }
}

async fn recruited(h: &Harness, format: TournamentFormat, n: usize) -> (TournamentId, Vec<TeamId>) {
    let new = NewTournament::new("City League", Sport::Futsal).with_format(format);
    let tournament = h.manager.create_tournament(h.host, new).await.unwrap();
    let mut teams = Vec::new();
    for i in 0..n {
        let team = h.store.add_team(&format!("Club {i}"), Sport::Futsal).await;
        h.manager
            .join_tournament(tournament.id, team, None)
            .await
            .unwrap();
        h.manager
            .approve_participant(h.host, tournament.id, team)
            .await
            .unwrap();
        teams.push(team);
    }
    (tournament.id, teams)
}

/// Team A of every match wins 1-0
async fn play_all(h: &Harness, matches: &[Match]) {
    for m in matches {
        h.manager
            .report_result(h.host, m.id, 1, 0, None)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_hybrid_groups_feed_the_playoff() {
    let h = harness().await;
    let format = TournamentFormat::Hybrid {
        group_count: Some(2),
        playoff_teams: 4,
    };
    let (id, _) = recruited(&h, format, 8).await;

    let league = h.manager.start_tournament(h.host, id).await.unwrap().matches;
    assert_eq!(league.len(), 12);
    assert!(league.iter().all(|m| m.stage == Stage::League));
    assert_eq!(league.iter().filter(|m| m.round_name == "A조").count(), 6);
    assert_eq!(league.iter().filter(|m| m.round_name == "B조").count(), 6);

    play_all(&h, &league[..11]).await;
    let err = h.manager.start_playoff(h.host, id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::LeaguePhaseIncomplete { pending: 1 }
    ));
    play_all(&h, &league[11..]).await;

    let standings = h.manager.get_standings(id).await.unwrap();
    assert_eq!(standings.groups.len(), 2);
    assert_eq!(standings.groups[0].group, "A조");
    let expected: Vec<TeamId> = standings
        .groups
        .iter()
        .flat_map(|g| g.rows.iter().take(2).map(|row| row.team_id))
        .collect();

    let playoff = h.manager.start_playoff(h.host, id).await.unwrap();
    assert_eq!(playoff.qualifiers, expected);
    assert_eq!(playoff.matches.len(), 2);
    assert!(
        playoff
            .matches
            .iter()
            .all(|m| m.stage == Stage::Tournament && m.round_name == "준결승")
    );
    assert_eq!(
        playoff.matches[0].both_teams(),
        Some((expected[0], expected[1]))
    );
    assert!(
        playoff
            .matches
            .iter()
            .all(|m| m.scheduled_at > league.iter().map(|l| l.scheduled_at).max().unwrap())
    );

    let again = h.manager.start_playoff(h.host, id).await.unwrap_err();
    assert!(matches!(again, EngineError::PlayoffAlreadyStarted));
    assert_eq!(again.kind(), ErrorKind::Conflict);

    // The playoff advances like any bracket
    play_all(&h, &playoff.matches).await;
    let bracket = h.manager.get_bracket(id).await.unwrap();
    assert_eq!(bracket.len(), 2);
    play_all(&h, &bracket[1].matches).await;
    let detail = h.manager.get_tournament(id).await.unwrap();
    assert_eq!(
        detail.tournament.status,
        TournamentStatus::Ended {
            champion: Some(expected[0])
        }
    );
}

#[tokio::test]
async fn test_indivisible_playoff_split_is_rejected() {
    let h = harness().await;
    let new = NewTournament::new("Odd Split", Sport::Futsal).with_format(TournamentFormat::Hybrid {
        group_count: Some(3),
        playoff_teams: 4,
    });
    let err = h.manager.create_tournament(h.host, new).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::IndivisiblePlayoffSplit {
            playoff_teams: 4,
            group_count: 3
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_undersized_groups_are_rejected() {
    let h = harness().await;
    let format = TournamentFormat::League {
        group_count: Some(3),
    };
    let (id, _) = recruited(&h, format, 5).await;

    let err = h.manager.start_tournament(h.host, id).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientTeams { .. }));
    assert!(h.manager.get_league_matches(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_single_league_crowns_the_leader() {
    let h = harness().await;
    let (id, _) = recruited(&h, TournamentFormat::League { group_count: None }, 4).await;

    let league = h.manager.start_tournament(h.host, id).await.unwrap().matches;
    assert_eq!(league.len(), 6);
    assert!(league.iter().all(|m| m.round_name == "League Round"));

    let err = h.manager.finish_league(h.host, id).await.unwrap_err();
    assert!(matches!(err, EngineError::LeaguePhaseIncomplete { pending: 6 }));

    // one draw, the rest home wins
    h.manager
        .report_result(h.host, league[0].id, 2, 2, None)
        .await
        .unwrap();
    play_all(&h, &league[1..]).await;

    let standings = h.manager.get_standings(id).await.unwrap();
    assert_eq!(standings.groups.len(), 1);
    let table = &standings.groups[0].rows;
    assert_eq!(table.iter().map(|r| r.played).sum::<u32>(), 12);
    assert_eq!(table.iter().map(|r| r.drawn).sum::<u32>(), 2);
    for pair in table.windows(2) {
        assert!(pair[0].points >= pair[1].points);
    }
    let leader = table[0].team_id;

    let ended = h.manager.finish_league(h.host, id).await.unwrap();
    assert_eq!(
        ended.status,
        TournamentStatus::Ended {
            champion: Some(leader)
        }
    );

    let not_hybrid = h.manager.start_playoff(h.host, id).await.unwrap_err();
    assert!(matches!(not_hybrid, EngineError::NotHybrid));
}

#[tokio::test]
async fn test_league_matches_never_advance() {
    let h = harness().await;
    let (id, _) = recruited(&h, TournamentFormat::League { group_count: None }, 3).await;
    let league = h.manager.start_tournament(h.host, id).await.unwrap().matches;

    play_all(&h, &league).await;
    assert!(h.manager.get_bracket(id).await.unwrap().is_empty());
    let detail = h.manager.get_tournament(id).await.unwrap();
    assert_eq!(detail.tournament.status, TournamentStatus::Ongoing);

    let sorted = h.manager.get_league_matches(id).await.unwrap();
    assert_eq!(sorted.len(), 3);
    assert!(sorted.windows(2).all(|w| w[0].id < w[1].id));
}

#[tokio::test]
async fn test_group_settings_freeze_after_start() {
    let h = harness().await;
    let (id, _) = recruited(&h, TournamentFormat::League { group_count: None }, 4).await;

    let updated = h
        .manager
        .update_settings(
            h.host,
            id,
            tourney_core::tournament::TournamentSettings {
                group_count: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.format.group_count(), Some(2));

    h.manager.start_tournament(h.host, id).await.unwrap();
    let err = h
        .manager
        .update_settings(
            h.host,
            id,
            tourney_core::tournament::TournamentSettings {
                group_count: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}
