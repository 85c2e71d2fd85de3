//! Point-betting on match outcomes.
//!
//! Users stake points on one side of an upcoming match. When the result is
//! recorded, the pot is shared among the backers of the winner in proportion
//! to their stakes.

pub mod manager;
pub mod models;
pub mod pool;
pub mod settlement;

pub use manager::PredictionManager;
pub use models::{
    BettingMatch, BoardStatus, MatchDetail, MatchStatistics, NewPrediction, Prediction,
    PredictionId, PredictionRecord, PredictionStatus, UserBet,
};
pub use pool::{PoolSnapshot, is_betting_open};
pub use settlement::{
    PredictionOutcome, SettlementPlan, SettlementSummary, payout, plan_settlement, settle_match,
};
