//! Engine error types.

use std::time::Duration;
use thiserror::Error;

use crate::{
    schedule::MatchId,
    tournament::{TeamId, TournamentId, UserId},
};

/// Broad classification of an [`EngineError`], used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request is malformed or violates a business rule
    Validation,
    /// The caller is not allowed to perform the action
    Permission,
    /// The action was already applied or the current state forbids it
    Conflict,
    /// A referenced entity does not exist
    NotFound,
    /// Storage failure; the transaction was rolled back and the caller may retry
    Internal,
}

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Transaction exceeded its time budget
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// A stored row could not be mapped back into a domain value
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Team not found: {0}")]
    TeamNotFound(TeamId),

    #[error("Team {team_id} has not applied to tournament {tournament_id}")]
    ParticipantNotFound {
        tournament_id: TournamentId,
        team_id: TeamId,
    },

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// Caller does not manage the tournament
    #[error("Only the tournament manager can do this")]
    NotManager,

    #[error("Tournament already started")]
    AlreadyStarted,

    #[error("Invalid tournament state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Match {0} already has a result")]
    MatchAlreadyDone(MatchId),

    #[error("Playoff already started")]
    PlayoffAlreadyStarted,

    #[error("Team already applied to this tournament")]
    AlreadyJoined,

    #[error("Participation request already {0}")]
    AlreadyProcessed(String),

    #[error("Insufficient teams: need {needed}, have {current}")]
    InsufficientTeams { needed: usize, current: usize },

    #[error("Playoff team count {playoff_teams} is not divisible by group count {group_count}")]
    IndivisiblePlayoffSplit { playoff_teams: u32, group_count: u32 },

    #[error("League phase incomplete: {pending} match(es) still pending")]
    LeaguePhaseIncomplete { pending: usize },

    #[error("Tournament is not a league-then-playoff tournament")]
    NotHybrid,

    #[error("Tournament is not a league")]
    NotLeague,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid result: {0}")]
    InvalidResult(String),

    #[error("Invalid bracket: {0}")]
    InvalidBracket(String),

    #[error("Team sport {team} does not match tournament sport {tournament}")]
    SportMismatch { team: String, tournament: String },

    #[error("Invalid invite code")]
    InvalidInviteCode,

    #[error("Betting is closed for this match")]
    BettingClosed,

    #[error("Team {0} is not playing in this match")]
    InvalidPick(TeamId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("Insufficient points: available {available}, required {required}")]
    InsufficientPoints { available: i64, required: i64 },

    #[error("Already placed a prediction on this match")]
    AlreadyPredicted,
}

impl EngineError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        use EngineError::*;

        match self {
            Database(_) | Migration(_) | Timeout(_) | Corrupt(_) => ErrorKind::Internal,
            TournamentNotFound(_)
            | MatchNotFound(_)
            | TeamNotFound(_)
            | ParticipantNotFound { .. }
            | UserNotFound(_) => ErrorKind::NotFound,
            NotManager => ErrorKind::Permission,
            AlreadyStarted
            | InvalidState { .. }
            | MatchAlreadyDone(_)
            | PlayoffAlreadyStarted
            | AlreadyJoined
            | AlreadyProcessed(_) => ErrorKind::Conflict,
            InsufficientTeams { .. }
            | IndivisiblePlayoffSplit { .. }
            | LeaguePhaseIncomplete { .. }
            | NotHybrid
            | NotLeague
            | InvalidConfig(_)
            | InvalidResult(_)
            | InvalidBracket(_)
            | SportMismatch { .. }
            | InvalidInviteCode
            | BettingClosed
            | InvalidPick(_)
            | InvalidAmount(_)
            | InsufficientPoints { .. }
            | AlreadyPredicted => ErrorKind::Validation,
        }
    }

    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal server error, please retry".to_string(),
            _ => self.to_string(),
        }
    }

    pub(crate) fn invalid_state(expected: &str, actual: impl ToString) -> Self {
        EngineError::InvalidState {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
