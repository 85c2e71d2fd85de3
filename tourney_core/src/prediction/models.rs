//! Prediction data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::pool::PoolSnapshot;
use crate::errors::EngineError;
use crate::schedule::{Match, MatchId};
use crate::tournament::{Sport, Team, TeamId, UserId};

/// Prediction ID type
pub type PredictionId = i64;

/// Prediction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    /// Stake taken, match not settled
    Pending,
    /// Picked the winner; payout credited
    Won,
    /// Picked the loser; stake forfeited
    Lost,
    /// Match ended without a winner; stake returned
    Refunded,
}

impl PredictionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionStatus::Pending => "pending",
            PredictionStatus::Won => "won",
            PredictionStatus::Lost => "lost",
            PredictionStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredictionStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PredictionStatus::Pending),
            "won" => Ok(PredictionStatus::Won),
            "lost" => Ok(PredictionStatus::Lost),
            "refunded" => Ok(PredictionStatus::Refunded),
            other => Err(EngineError::Corrupt(format!(
                "unknown prediction status '{other}'"
            ))),
        }
    }
}

/// A user's stake on one side of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: PredictionId,
    pub match_id: MatchId,
    pub user_id: UserId,
    pub predicted_team_id: TeamId,
    pub bet_amount: i64,
    pub status: PredictionStatus,
    /// Set at settlement
    pub payout: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Input for placing a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPrediction {
    pub match_id: MatchId,
    pub user_id: UserId,
    pub predicted_team_id: TeamId,
    pub bet_amount: i64,
}

/// The viewer's own stake on a board entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBet {
    pub team_id: TeamId,
    pub amount: i64,
}

/// Coarse match status shown on the betting board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoardStatus {
    Pending,
    Completed,
}

/// One match on the betting board
#[derive(Debug, Clone, Serialize)]
pub struct BettingMatch {
    pub match_id: MatchId,
    pub tournament_name: String,
    pub sport: Sport,
    pub team_a: Team,
    pub team_b: Team,
    pub scheduled_at: DateTime<Utc>,
    pub status: BoardStatus,
    pub winner_team_id: Option<TeamId>,
    pub pool: PoolSnapshot,
    pub user_bet: Option<UserBet>,
    pub earned_points: Option<i64>,
    pub is_betting_open: bool,
}

/// A user's prediction with its match context
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRecord {
    pub prediction: Prediction,
    /// "Team A vs Team B"
    pub match_label: String,
    pub predicted_team: String,
    /// "+{payout}P" once won, "-" otherwise
    pub result: String,
}

/// Pool figures for one match
#[derive(Debug, Clone, Serialize)]
pub struct MatchStatistics {
    pub match_id: MatchId,
    pub pool: PoolSnapshot,
    pub prediction_count: usize,
}

/// Match detail with betting context
#[derive(Debug, Clone, Serialize)]
pub struct MatchDetail {
    #[serde(rename = "match")]
    pub match_: Match,
    pub team_a: Option<Team>,
    pub team_b: Option<Team>,
    pub pool: PoolSnapshot,
    pub is_betting_open: bool,
    /// Viewer's balance when a viewer is known
    pub viewer_points: Option<i64>,
}

impl PredictionRecord {
    pub fn result_text(prediction: &Prediction) -> String {
        match (prediction.status, prediction.payout) {
            (PredictionStatus::Won, Some(payout)) => format!("+{payout}P"),
            (PredictionStatus::Refunded, Some(payout)) => format!("±{payout}P"),
            _ => "-".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(status: PredictionStatus, payout: Option<i64>) -> Prediction {
        Prediction {
            id: 1,
            match_id: 1,
            user_id: 1,
            predicted_team_id: 1,
            bet_amount: 100,
            status,
            payout,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_result_text() {
        assert_eq!(
            PredictionRecord::result_text(&prediction(PredictionStatus::Won, Some(250))),
            "+250P"
        );
        assert_eq!(
            PredictionRecord::result_text(&prediction(PredictionStatus::Lost, Some(0))),
            "-"
        );
        assert_eq!(
            PredictionRecord::result_text(&prediction(PredictionStatus::Pending, None)),
            "-"
        );
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "refunded".parse::<PredictionStatus>().unwrap(),
            PredictionStatus::Refunded
        );
        assert!("void".parse::<PredictionStatus>().is_err());
    }
}
