//! Prediction manager: placing stakes and the betting read models.

use log::info;
use std::collections::HashMap;
use std::sync::Arc;

use super::models::{
    BettingMatch, BoardStatus, MatchStatistics, NewPrediction, Prediction, PredictionRecord,
    PredictionStatus, UserBet,
};
use super::pool::{PoolSnapshot, is_betting_open};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::db::timeouts::with_timeout;
use crate::db::{Store, StoreTx};
use crate::errors::{EngineError, EngineResult};
use crate::points::{EntryType, PointsChange, PointsEntry, UserAccount};
use crate::schedule::{Match, MatchId};
use crate::tournament::{TeamId, Tournament, TournamentId, UserId};

/// Most ledger entries returned by one history call
pub const MAX_HISTORY_ENTRIES: i64 = 100;

/// Prediction manager
#[derive(Clone)]
pub struct PredictionManager {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

async fn load_match(tx: &mut dyn StoreTx, match_id: MatchId) -> EngineResult<Match> {
    tx.match_by_id(match_id)
        .await?
        .ok_or(EngineError::MatchNotFound(match_id))
}

async fn load_user(tx: &mut dyn StoreTx, user_id: UserId) -> EngineResult<UserAccount> {
    tx.user(user_id)
        .await?
        .ok_or(EngineError::UserNotFound(user_id))
}

async fn team_name(tx: &mut dyn StoreTx, team_id: Option<TeamId>) -> EngineResult<String> {
    Ok(match team_id {
        Some(id) => tx
            .team(id)
            .await?
            .map(|t| t.name)
            .unwrap_or_else(|| format!("Team {id}")),
        None => "TBD".to_string(),
    })
}

impl PredictionManager {
    /// Create a new prediction manager
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Stake points on one team of an upcoming match
    ///
    /// The stake is debited in the same transaction that records the
    /// prediction.
    ///
    /// # Errors
    ///
    /// * `EngineError::InvalidAmount` - Amount is not positive
    /// * `EngineError::BettingClosed` - Match started, finished, lacks a team or is today
    /// * `EngineError::InvalidPick` - Team does not play in the match
    /// * `EngineError::AlreadyPredicted` - One prediction per user and match
    /// * `EngineError::InsufficientPoints` - Balance below the stake
    pub async fn create_prediction(
        &self,
        user_id: UserId,
        match_id: MatchId,
        team_id: TeamId,
        amount: i64,
    ) -> EngineResult<Prediction> {
        with_timeout(self.config.transaction_timeout, async {
            if amount <= 0 {
                return Err(EngineError::InvalidAmount(amount));
            }

            let mut tx = self.store.begin().await?;
            let unlocked = load_match(tx.as_mut(), match_id).await?;
            // Serializes with result reporting on the same tournament
            tx.lock_tournament(unlocked.tournament_id)
                .await?
                .ok_or(EngineError::TournamentNotFound(unlocked.tournament_id))?;
            let m = load_match(tx.as_mut(), match_id).await?;

            if !is_betting_open(&m, self.clock.now(), &self.config) {
                return Err(EngineError::BettingClosed);
            }
            if !m.involves(team_id) {
                return Err(EngineError::InvalidPick(team_id));
            }
            if tx.prediction_for(user_id, match_id).await?.is_some() {
                return Err(EngineError::AlreadyPredicted);
            }

            let user = load_user(tx.as_mut(), user_id).await?;
            let insufficient = EngineError::InsufficientPoints {
                available: user.points,
                required: amount,
            };
            if user.points < amount {
                return Err(insufficient);
            }

            let prediction = tx
                .insert_prediction(&NewPrediction {
                    match_id,
                    user_id,
                    predicted_team_id: team_id,
                    bet_amount: amount,
                })
                .await?;
            let stake = PointsChange {
                user_id,
                amount,
                entry_type: EntryType::BetStake,
                match_id: Some(match_id),
                prediction_id: Some(prediction.id),
            };
            let balance = tx.debit_points(&stake).await?.ok_or(insufficient)?;
            tx.commit().await?;

            info!(
                "User {} staked {} on team {} in match {} (balance {})",
                user_id, amount, team_id, match_id, balance
            );
            Ok(prediction)
        })
        .await
    }

    /// Every match with two teams, with its pool and the viewer's own stake
    pub async fn betting_board(&self, viewer: Option<UserId>) -> EngineResult<Vec<BettingMatch>> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let now = self.clock.now();
            let mut tournaments: HashMap<TournamentId, Tournament> = HashMap::new();
            let mut board = Vec::new();

            for m in tx.bettable_matches().await? {
                let Some((a, b)) = m.both_teams() else {
                    continue;
                };
                if !tournaments.contains_key(&m.tournament_id) {
                    if let Some(t) = tx.tournament(m.tournament_id).await? {
                        tournaments.insert(t.id, t);
                    }
                }
                let Some(tournament) = tournaments.get(&m.tournament_id) else {
                    continue;
                };

                let team_a = tx.team(a).await?.ok_or(EngineError::TeamNotFound(a))?;
                let team_b = tx.team(b).await?.ok_or(EngineError::TeamNotFound(b))?;
                let predictions = tx.predictions_for_match(m.id, None).await?;
                let mine = viewer.and_then(|user| predictions.iter().find(|p| p.user_id == user));

                board.push(BettingMatch {
                    match_id: m.id,
                    tournament_name: tournament.name.clone(),
                    sport: tournament.sport,
                    team_a,
                    team_b,
                    scheduled_at: m.scheduled_at,
                    status: if m.is_done() {
                        BoardStatus::Completed
                    } else {
                        BoardStatus::Pending
                    },
                    winner_team_id: m.winner(),
                    pool: PoolSnapshot::from_predictions(&m, &predictions),
                    user_bet: mine.map(|p| UserBet {
                        team_id: p.predicted_team_id,
                        amount: p.bet_amount,
                    }),
                    earned_points: mine
                        .filter(|p| p.status != PredictionStatus::Pending)
                        .map(|p| p.payout.unwrap_or(0)),
                    is_betting_open: is_betting_open(&m, now, &self.config),
                });
            }
            Ok(board)
        })
        .await
    }

    /// Pool totals for one match
    pub async fn match_statistics(&self, match_id: MatchId) -> EngineResult<MatchStatistics> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let m = load_match(tx.as_mut(), match_id).await?;
            let predictions = tx.predictions_for_match(match_id, None).await?;

            Ok(MatchStatistics {
                match_id,
                pool: PoolSnapshot::from_predictions(&m, &predictions),
                prediction_count: predictions.len(),
            })
        })
        .await
    }

    /// A user's predictions, newest first
    pub async fn my_predictions(&self, user_id: UserId) -> EngineResult<Vec<PredictionRecord>> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            let predictions = tx.predictions_for_user(user_id).await?;

            let mut records = Vec::with_capacity(predictions.len());
            for prediction in predictions {
                let m = load_match(tx.as_mut(), prediction.match_id).await?;
                let match_label = format!(
                    "{} vs {}",
                    team_name(tx.as_mut(), m.team_a).await?,
                    team_name(tx.as_mut(), m.team_b).await?
                );
                let predicted_team =
                    team_name(tx.as_mut(), Some(prediction.predicted_team_id)).await?;

                records.push(PredictionRecord {
                    result: PredictionRecord::result_text(&prediction),
                    prediction,
                    match_label,
                    predicted_team,
                });
            }
            Ok(records)
        })
        .await
    }

    /// Current points balance
    pub async fn points_balance(&self, user_id: UserId) -> EngineResult<UserAccount> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            load_user(tx.as_mut(), user_id).await
        })
        .await
    }

    /// Latest ledger entries, at most [`MAX_HISTORY_ENTRIES`]
    pub async fn points_history(&self, user_id: UserId, limit: i64) -> EngineResult<Vec<PointsEntry>> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.store.begin().await?;
            load_user(tx.as_mut(), user_id).await?;
            tx.points_history(user_id, limit.clamp(1, MAX_HISTORY_ENTRIES))
                .await
        })
        .await
    }
}
