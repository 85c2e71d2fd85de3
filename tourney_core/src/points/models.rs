//! Points ledger data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::EngineError;
use crate::schedule::MatchId;
use crate::tournament::UserId;

/// User account as seen by the engine: identity plus point balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    pub points: i64,
}

/// Points ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsEntry {
    pub id: i64,
    pub user_id: UserId,
    pub amount: i64,
    pub balance_after: i64,
    pub direction: EntryDirection,
    pub entry_type: EntryType,
    pub match_id: Option<MatchId>,
    pub prediction_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Balance change to append to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsChange {
    pub user_id: UserId,
    pub amount: i64,
    pub entry_type: EntryType,
    pub match_id: Option<MatchId>,
    pub prediction_id: Option<i64>,
}

/// Entry direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    Debit,
    Credit,
}

impl std::fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryDirection::Debit => write!(f, "debit"),
            EntryDirection::Credit => write!(f, "credit"),
        }
    }
}

impl FromStr for EntryDirection {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(EntryDirection::Debit),
            "credit" => Ok(EntryDirection::Credit),
            other => Err(EngineError::Corrupt(format!("unknown direction '{other}'"))),
        }
    }
}

/// Entry type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Stake taken when a prediction is placed
    BetStake,
    /// Pari-mutuel payout on a winning prediction
    BetPayout,
    /// Stake returned when a match ends without a winner
    BetRefund,
}

impl EntryType {
    pub fn direction(&self) -> EntryDirection {
        match self {
            EntryType::BetStake => EntryDirection::Debit,
            EntryType::BetPayout | EntryType::BetRefund => EntryDirection::Credit,
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryType::BetStake => write!(f, "bet_stake"),
            EntryType::BetPayout => write!(f, "bet_payout"),
            EntryType::BetRefund => write!(f, "bet_refund"),
        }
    }
}

impl FromStr for EntryType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bet_stake" => Ok(EntryType::BetStake),
            "bet_payout" => Ok(EntryType::BetPayout),
            "bet_refund" => Ok(EntryType::BetRefund),
            other => Err(EngineError::Corrupt(format!("unknown entry type '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_direction() {
        assert_eq!(EntryType::BetStake.direction(), EntryDirection::Debit);
        assert_eq!(EntryType::BetPayout.direction(), EntryDirection::Credit);
        assert_eq!(EntryType::BetRefund.direction(), EntryDirection::Credit);
    }

    #[test]
    fn test_entry_type_text_round_trip_matches_serde() {
        for entry_type in [EntryType::BetStake, EntryType::BetPayout, EntryType::BetRefund] {
            let text = entry_type.to_string();
            assert_eq!(text.parse::<EntryType>().unwrap(), entry_type);
            assert_eq!(serde_json::to_value(entry_type).unwrap(), text);
        }
    }
}
