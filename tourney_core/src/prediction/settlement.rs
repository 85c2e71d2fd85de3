//! Pari-mutuel settlement.
//!
//! The whole pot is shared among predictions on the winner in proportion to
//! their stakes: `payout = floor(stake * total_pot / winning_pot)`. When nobody
//! backed the winner every stake is forfeited and nothing is paid. A match that
//! ends without a winner refunds every stake.

use log::{debug, info};
use serde::Serialize;

use super::models::{Prediction, PredictionId, PredictionStatus};
use crate::db::StoreTx;
use crate::errors::EngineResult;
use crate::points::{EntryType, PointsChange};
use crate::schedule::MatchId;
use crate::tournament::{TeamId, UserId};

/// Settlement of a single prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionOutcome {
    pub prediction_id: PredictionId,
    pub user_id: UserId,
    pub status: PredictionStatus,
    pub payout: i64,
}

impl PredictionOutcome {
    fn credit(&self, match_id: MatchId) -> Option<PointsChange> {
        let entry_type = match self.status {
            PredictionStatus::Won => EntryType::BetPayout,
            PredictionStatus::Refunded => EntryType::BetRefund,
            PredictionStatus::Pending | PredictionStatus::Lost => return None,
        };
        (self.payout > 0).then_some(PointsChange {
            user_id: self.user_id,
            amount: self.payout,
            entry_type,
            match_id: Some(match_id),
            prediction_id: Some(self.prediction_id),
        })
    }
}

/// Settlement computed for one match, before it is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    pub match_id: MatchId,
    pub winner: Option<TeamId>,
    pub total_pot: i64,
    pub winning_pot: i64,
    pub outcomes: Vec<PredictionOutcome>,
}

/// Totals reported after a settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettlementSummary {
    pub match_id: MatchId,
    pub total_pot: i64,
    pub winning_pot: i64,
    pub paid_out: i64,
    /// Stakes nobody received: floor remainders, or the whole pot when nobody backed the winner
    pub house_take: i64,
    pub winners: usize,
    pub losers: usize,
    pub refunded: usize,
}

/// Compute payouts for the pending predictions on a match
///
/// Non-pending predictions are ignored, so planning an already settled match
/// yields an empty plan.
pub fn plan_settlement(
    match_id: MatchId,
    predictions: &[Prediction],
    winner: Option<TeamId>,
) -> SettlementPlan {
    let pending: Vec<&Prediction> = predictions
        .iter()
        .filter(|p| p.status == PredictionStatus::Pending)
        .collect();

    let total_pot: i64 = pending.iter().map(|p| p.bet_amount).sum();
    let winning_pot: i64 = pending
        .iter()
        .filter(|p| Some(p.predicted_team_id) == winner)
        .map(|p| p.bet_amount)
        .sum();

    let outcomes = pending
        .iter()
        .map(|p| {
            let (status, payout) = match winner {
                None => (PredictionStatus::Refunded, p.bet_amount),
                Some(team) if p.predicted_team_id == team => {
                    (PredictionStatus::Won, payout(p.bet_amount, total_pot, winning_pot))
                }
                Some(_) => (PredictionStatus::Lost, 0),
            };
            PredictionOutcome {
                prediction_id: p.id,
                user_id: p.user_id,
                status,
                payout,
            }
        })
        .collect();

    SettlementPlan {
        match_id,
        winner,
        total_pot,
        winning_pot,
        outcomes,
    }
}

/// `floor(stake * total / winning)` in exact integer arithmetic
pub fn payout(stake: i64, total_pot: i64, winning_pot: i64) -> i64 {
    if winning_pot <= 0 {
        // multiplier 1; unreachable for a winning stake but kept total
        return stake;
    }
    (i128::from(stake) * i128::from(total_pot) / i128::from(winning_pot)) as i64
}

impl SettlementPlan {
    /// Pot multiplier; 1 when nobody backed the winner
    pub fn multiplier(&self) -> f64 {
        if self.winning_pot > 0 {
            self.total_pot as f64 / self.winning_pot as f64
        } else {
            1.0
        }
    }

    pub fn summary(&self) -> SettlementSummary {
        let count = |status: PredictionStatus| self.outcomes.iter().filter(|o| o.status == status).count();
        let paid_out: i64 = self
            .outcomes
            .iter()
            .filter(|o| o.status == PredictionStatus::Won)
            .map(|o| o.payout)
            .sum();
        let refunded = count(PredictionStatus::Refunded);
        let house_take = if self.winner.is_some() {
            self.total_pot - paid_out
        } else {
            0
        };

        SettlementSummary {
            match_id: self.match_id,
            total_pot: self.total_pot,
            winning_pot: self.winning_pot,
            paid_out,
            house_take,
            winners: count(PredictionStatus::Won),
            losers: count(PredictionStatus::Lost),
            refunded,
        }
    }

    /// Persist statuses and credit balances inside `tx`
    pub async fn apply(&self, tx: &mut dyn StoreTx) -> EngineResult<SettlementSummary> {
        for outcome in &self.outcomes {
            tx.settle_prediction(outcome.prediction_id, outcome.status, outcome.payout)
                .await?;
            if let Some(change) = outcome.credit(self.match_id) {
                let balance = tx.credit_points(&change).await?;
                debug!(
                    "Credited {} points to user {} for prediction {} (balance {})",
                    change.amount, change.user_id, outcome.prediction_id, balance
                );
            }
        }

        let summary = self.summary();
        info!(
            "Settled match {}: pot {}, winning pot {}, paid {}, house {}, refunded {}",
            summary.match_id,
            summary.total_pot,
            summary.winning_pot,
            summary.paid_out,
            summary.house_take,
            summary.refunded
        );
        Ok(summary)
    }
}

/// Settle every pending prediction on a match inside `tx`
pub async fn settle_match(
    tx: &mut dyn StoreTx,
    match_id: MatchId,
    winner: Option<TeamId>,
) -> EngineResult<SettlementSummary> {
    let predictions = tx
        .predictions_for_match(match_id, Some(PredictionStatus::Pending))
        .await?;
    plan_settlement(match_id, &predictions, winner)
        .apply(tx)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bet(id: i64, user: i64, team: TeamId, amount: i64) -> Prediction {
        Prediction {
            id,
            match_id: 1,
            user_id: user,
            predicted_team_id: team,
            bet_amount: amount,
            status: PredictionStatus::Pending,
            payout: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_winner_takes_pot() {
        // 100 on A, 150 on B, A wins: multiplier 2.5
        let plan = plan_settlement(1, &[bet(1, 1, 10, 100), bet(2, 2, 20, 150)], Some(10));

        assert_eq!(plan.total_pot, 250);
        assert_eq!(plan.winning_pot, 100);
        assert_eq!(plan.multiplier(), 2.5);
        assert_eq!(plan.outcomes[0].status, PredictionStatus::Won);
        assert_eq!(plan.outcomes[0].payout, 250);
        assert_eq!(plan.outcomes[1].status, PredictionStatus::Lost);
        assert_eq!(plan.outcomes[1].payout, 0);

        let summary = plan.summary();
        assert_eq!(summary.paid_out, 250);
        assert_eq!(summary.house_take, 0);
    }

    #[test]
    fn test_floor_rounding() {
        // pot 100, winning pot 30: each 10-stake gets floor(33.3) = 33
        let plan = plan_settlement(
            1,
            &[
                bet(1, 1, 10, 10),
                bet(2, 2, 10, 10),
                bet(3, 3, 10, 10),
                bet(4, 4, 20, 70),
            ],
            Some(10),
        );
        let summary = plan.summary();
        assert_eq!(summary.paid_out, 99);
        assert_eq!(summary.house_take, 1);
        assert_eq!(summary.winners, 3);
    }

    #[test]
    fn test_nobody_backed_winner_forfeits_everything() {
        let plan = plan_settlement(1, &[bet(1, 1, 20, 100), bet(2, 2, 20, 50)], Some(10));

        assert_eq!(plan.winning_pot, 0);
        assert_eq!(plan.multiplier(), 1.0);
        assert!(plan.outcomes.iter().all(|o| o.status == PredictionStatus::Lost));

        let summary = plan.summary();
        assert_eq!(summary.paid_out, 0);
        assert_eq!(summary.house_take, 150);
    }

    #[test]
    fn test_draw_refunds_stakes() {
        let plan = plan_settlement(1, &[bet(1, 1, 10, 40), bet(2, 2, 20, 60)], None);
        assert!(
            plan.outcomes
                .iter()
                .all(|o| o.status == PredictionStatus::Refunded)
        );
        assert_eq!(plan.outcomes[1].payout, 60);
        assert_eq!(plan.summary().house_take, 0);
        assert_eq!(plan.summary().refunded, 2);
    }

    #[test]
    fn test_settled_predictions_ignored() {
        let mut settled = bet(1, 1, 10, 100);
        settled.status = PredictionStatus::Won;
        let plan = plan_settlement(1, &[settled], Some(10));
        assert!(plan.outcomes.is_empty());
        assert_eq!(plan.total_pot, 0);
    }

    #[test]
    fn test_credit_only_for_positive_payouts() {
        let won = PredictionOutcome {
            prediction_id: 1,
            user_id: 1,
            status: PredictionStatus::Won,
            payout: 10,
        };
        assert_eq!(won.credit(5).unwrap().entry_type, EntryType::BetPayout);

        let lost = PredictionOutcome {
            status: PredictionStatus::Lost,
            payout: 0,
            ..won
        };
        assert!(lost.credit(5).is_none());
    }
}
