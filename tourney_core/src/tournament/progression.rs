//! Bracket advancement.
//!
//! Runs inside the transaction that records a result. Once every match of a
//! bracket round is done, the winners either crown a champion or are paired
//! into the next round. The next round is only created if no round with the
//! same label exists yet, so re-running advancement never duplicates matches.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use super::models::{TeamId, Tournament, TournamentStatus};
use crate::config::EngineConfig;
use crate::db::StoreTx;
use crate::errors::{EngineError, EngineResult};
use crate::schedule::window::next_round_base;
use crate::schedule::{Match, Stage, generate_bracket, round_label, round_size};

/// What recording a result did to the bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advancement {
    /// League matches never advance anything
    LeagueMatch,
    /// Other matches of the round are still open
    RoundPending { remaining: usize },
    /// The winners were paired into a new round
    NextRound {
        round_name: String,
        matches: Vec<Match>,
    },
    /// The round had a single winner
    Champion { team_id: TeamId },
    /// The next round already existed; nothing was created
    AlreadyGenerated { round_name: String },
}

/// Advance the bracket after `finished` was resolved
///
/// Updates `tournament` in place (and in `tx`) when a champion is crowned.
pub async fn advance_round(
    tx: &mut dyn StoreTx,
    tournament: &mut Tournament,
    finished: &Match,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> EngineResult<Advancement> {
    if finished.stage == Stage::League {
        return Ok(Advancement::LeagueMatch);
    }

    let round = tx
        .round_matches(tournament.id, finished.stage, &finished.round_name)
        .await?;

    let remaining = round.iter().filter(|m| !m.is_done()).count();
    if remaining > 0 {
        debug!(
            "Round {} of tournament {}: {} match(es) remaining",
            finished.round_name, tournament.id, remaining
        );
        return Ok(Advancement::RoundPending { remaining });
    }

    let winners: Vec<TeamId> = round.iter().filter_map(Match::winner).collect();

    match winners.as_slice() {
        [] => Err(EngineError::Corrupt(format!(
            "round {} of tournament {} resolved without winners",
            finished.round_name, tournament.id
        ))),
        [champion] => {
            tournament.status = TournamentStatus::Ended {
                champion: Some(*champion),
            };
            tx.update_tournament(tournament).await?;
            info!(
                "Tournament {} ended, champion team {}",
                tournament.id, champion
            );
            Ok(Advancement::Champion { team_id: *champion })
        }
        _ => {
            let round_name = round_label(round_size(winners.len()));
            if tx
                .round_exists(tournament.id, finished.stage, &round_name)
                .await?
            {
                warn!(
                    "Round {} of tournament {} already exists, skipping generation",
                    round_name, tournament.id
                );
                return Ok(Advancement::AlreadyGenerated { round_name });
            }

            let last_match = round.iter().map(|m| m.scheduled_at).max();
            let base = next_round_base(last_match, now, config);
            let new_matches = generate_bracket(&winners, finished.stage, base, config)?;
            let matches = tx.insert_matches(tournament.id, &new_matches).await?;

            debug!(
                "Tournament {}: generated {} with {} match(es) for {} winners",
                tournament.id,
                round_name,
                matches.len(),
                winners.len()
            );
            Ok(Advancement::NextRound {
                round_name,
                matches,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, Store};
    use crate::schedule::{MatchState, NewMatch, Score};
    use crate::tournament::{NewTournament, Sport};

    fn done(winner: TeamId) -> MatchState {
        MatchState::Done {
            score: Some(Score::new(1, 0)),
            winner: Some(winner),
        }
    }

    #[tokio::test]
    async fn test_round_advances_once() {
        let store = MemoryStore::new();
        let config = EngineConfig::default();
        let now = Utc::now();
        let mut tx = store.begin().await.unwrap();

        let mut tournament = tx
            .insert_tournament(1, &NewTournament::new("Cup", Sport::Soccer), None)
            .await
            .unwrap();
        let round = generate_bracket(&[1, 2, 3, 4], Stage::Tournament, now, &config).unwrap();
        let round = tx.insert_matches(tournament.id, &round).await.unwrap();

        tx.update_match_state(round[0].id, &done(1)).await.unwrap();
        let first = tx.match_by_id(round[0].id).await.unwrap().unwrap();
        let pending = advance_round(tx.as_mut(), &mut tournament, &first, &config, now)
            .await
            .unwrap();
        assert_eq!(pending, Advancement::RoundPending { remaining: 1 });

        tx.update_match_state(round[1].id, &done(4)).await.unwrap();
        let second = tx.match_by_id(round[1].id).await.unwrap().unwrap();
        let next = advance_round(tx.as_mut(), &mut tournament, &second, &config, now)
            .await
            .unwrap();
        match next {
            Advancement::NextRound {
                round_name,
                matches,
            } => {
                assert_eq!(round_name, "결승");
                assert_eq!(matches.len(), 1);
                assert_eq!(matches[0].both_teams(), Some((1, 4)));
            }
            other => panic!("unexpected advancement {other:?}"),
        }

        let again = advance_round(tx.as_mut(), &mut tournament, &second, &config, now)
            .await
            .unwrap();
        assert_eq!(
            again,
            Advancement::AlreadyGenerated {
                round_name: "결승".to_string()
            }
        );
        assert_eq!(
            tx.round_matches(tournament.id, Stage::Tournament, "결승")
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_single_winner_crowns_champion() {
        let store = MemoryStore::new();
        let config = EngineConfig::default();
        let now = Utc::now();
        let mut tx = store.begin().await.unwrap();

        let mut tournament = tx
            .insert_tournament(1, &NewTournament::new("Cup", Sport::LoL), None)
            .await
            .unwrap();
        let final_round = tx
            .insert_matches(
                tournament.id,
                &[NewMatch::pairing(
                    Stage::Tournament,
                    "결승",
                    Some(7),
                    Some(8),
                    now,
                )],
            )
            .await
            .unwrap();
        tx.update_match_state(final_round[0].id, &done(8))
            .await
            .unwrap();
        let resolved = tx.match_by_id(final_round[0].id).await.unwrap().unwrap();

        let outcome = advance_round(tx.as_mut(), &mut tournament, &resolved, &config, now)
            .await
            .unwrap();
        assert_eq!(outcome, Advancement::Champion { team_id: 8 });
        assert_eq!(tournament.status.champion(), Some(8));

        let stored = tx.tournament(tournament.id).await.unwrap().unwrap();
        assert_eq!(
            stored.status,
            TournamentStatus::Ended { champion: Some(8) }
        );
    }

    #[tokio::test]
    async fn test_league_matches_do_not_advance() {
        let store = MemoryStore::new();
        let config = EngineConfig::default();
        let mut tx = store.begin().await.unwrap();
        let mut tournament = tx
            .insert_tournament(1, &NewTournament::new("League", Sport::Futsal), None)
            .await
            .unwrap();
        let league = NewMatch::pairing(Stage::League, "A조", Some(1), Some(2), Utc::now())
            .into_match(99, tournament.id);

        let outcome = advance_round(tx.as_mut(), &mut tournament, &league, &config, Utc::now())
            .await
            .unwrap();
        assert_eq!(outcome, Advancement::LeagueMatch);
    }
}
