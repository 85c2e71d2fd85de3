//! Betting pool figures and the betting window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::Prediction;
use crate::config::EngineConfig;
use crate::schedule::{Match, MatchState, window::local_date};

/// Indicative ratio shown when nobody has bet yet
pub const EMPTY_POOL_RATIO: f64 = 2.0;

/// Indicative ratio shown for a side nobody has backed
pub const EMPTY_SIDE_RATIO: f64 = 1.0;

/// Stakes on each side of a match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub team_a_total: i64,
    pub team_b_total: i64,
    pub total: i64,
    pub team_a_percent: u32,
    pub team_b_percent: u32,
    pub team_a_ratio: f64,
    pub team_b_ratio: f64,
}

impl PoolSnapshot {
    /// Summarize the predictions on `m`
    pub fn from_predictions(m: &Match, predictions: &[Prediction]) -> Self {
        let total: i64 = predictions.iter().map(|p| p.bet_amount).sum();
        let team_a_total: i64 = predictions
            .iter()
            .filter(|p| Some(p.predicted_team_id) == m.team_a)
            .map(|p| p.bet_amount)
            .sum();
        let team_b_total = total - team_a_total;

        Self {
            team_a_total,
            team_b_total,
            total,
            team_a_percent: percent(team_a_total, total),
            team_b_percent: percent(team_b_total, total),
            team_a_ratio: ratio(team_a_total, total),
            team_b_ratio: ratio(team_b_total, total),
        }
    }
}

fn percent(side: i64, total: i64) -> u32 {
    if total == 0 {
        return 50;
    }
    (side as f64 / total as f64 * 100.0).round() as u32
}

fn ratio(side: i64, total: i64) -> f64 {
    if total == 0 {
        EMPTY_POOL_RATIO
    } else if side == 0 {
        EMPTY_SIDE_RATIO
    } else {
        (total as f64 / side as f64 * 100.0).round() / 100.0
    }
}

/// Betting stays open until the start of the match's local calendar day
pub fn is_betting_open(m: &Match, now: DateTime<Utc>, config: &EngineConfig) -> bool {
    if m.state != MatchState::Upcoming || m.both_teams().is_none() {
        return false;
    }
    let offset = config.offset();
    local_date(now, offset) < local_date(m.scheduled_at, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::PredictionStatus;
    use crate::schedule::Stage;
    use chrono::{Duration, TimeZone};

    fn fixture(at: DateTime<Utc>) -> Match {
        Match {
            id: 1,
            tournament_id: 1,
            stage: Stage::Tournament,
            round_name: "결승".to_string(),
            team_a: Some(10),
            team_b: Some(20),
            scheduled_at: at,
            state: MatchState::Upcoming,
        }
    }

    fn bet(team: i64, amount: i64) -> Prediction {
        Prediction {
            id: 0,
            match_id: 1,
            user_id: 0,
            predicted_team_id: team,
            bet_amount: amount,
            status: PredictionStatus::Pending,
            payout: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_pool() {
        let m = fixture(Utc::now());
        let pool = PoolSnapshot::from_predictions(&m, &[]);
        assert_eq!((pool.team_a_percent, pool.team_b_percent), (50, 50));
        assert_eq!((pool.team_a_ratio, pool.team_b_ratio), (2.0, 2.0));
    }

    #[test]
    fn test_pool_ratios() {
        let m = fixture(Utc::now());
        let pool = PoolSnapshot::from_predictions(&m, &[bet(10, 100), bet(10, 200), bet(20, 150)]);
        assert_eq!(pool.team_a_total, 300);
        assert_eq!(pool.team_b_total, 150);
        assert_eq!(pool.team_a_percent, 67);
        assert_eq!(pool.team_b_percent, 33);
        assert_eq!(pool.team_a_ratio, 1.5);
        assert_eq!(pool.team_b_ratio, 3.0);
    }

    #[test]
    fn test_one_sided_pool() {
        let m = fixture(Utc::now());
        let pool = PoolSnapshot::from_predictions(&m, &[bet(20, 80)]);
        assert_eq!(pool.team_a_ratio, 1.0);
        assert_eq!(pool.team_b_ratio, 1.0);
        assert_eq!(pool.team_b_percent, 100);
    }

    #[test]
    fn test_betting_closes_on_match_day() {
        let config = EngineConfig::default();
        // 18:00 at +09:00
        let kickoff = Utc.with_ymd_and_hms(2025, 7, 10, 9, 0, 0).unwrap();
        let m = fixture(kickoff);

        assert!(is_betting_open(&m, kickoff - Duration::days(1), &config));
        // 00:30 local on match day
        let match_day = Utc.with_ymd_and_hms(2025, 7, 9, 15, 30, 0).unwrap();
        assert!(!is_betting_open(&m, match_day, &config));
        // 23:30 local the day before
        let eve = Utc.with_ymd_and_hms(2025, 7, 9, 14, 30, 0).unwrap();
        assert!(is_betting_open(&m, eve, &config));
    }

    #[test]
    fn test_betting_closed_when_done_or_missing_team() {
        let config = EngineConfig::default();
        let kickoff = Utc::now() + Duration::days(3);

        let mut m = fixture(kickoff);
        m.team_b = None;
        assert!(!is_betting_open(&m, Utc::now(), &config));

        let mut m = fixture(kickoff);
        m.state = MatchState::Done {
            score: None,
            winner: Some(10),
        };
        assert!(!is_betting_open(&m, Utc::now(), &config));
    }
}
