//! Repository trait definitions for testability and dependency injection.
//!
//! Engine operations run against a [`StoreTx`] obtained from a [`Store`]. Every
//! read and write inside one operation goes through the same transaction, and
//! nothing becomes visible until [`StoreTx::commit`]. Dropping a transaction
//! without committing rolls it back.

use async_trait::async_trait;

use crate::errors::EngineResult;
use crate::points::{PointsChange, PointsEntry, UserAccount};
use crate::prediction::{NewPrediction, Prediction, PredictionId, PredictionStatus};
use crate::schedule::{Match, MatchId, MatchState, NewMatch, Stage};
use crate::tournament::{
    NewTournament, Participant, ParticipantStatus, Team, TeamId, Tournament, TournamentFilter,
    TournamentId, TournamentSummary, UserId,
};

/// Transactional storage backend
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transaction
    async fn begin(&self) -> EngineResult<Box<dyn StoreTx>>;
}

/// One open storage transaction
#[async_trait]
pub trait StoreTx: Send {
    // Tournaments

    /// Insert a tournament in RECRUITING status
    async fn insert_tournament(
        &mut self,
        manager_id: UserId,
        new: &NewTournament,
        invite_code: Option<String>,
    ) -> EngineResult<Tournament>;

    /// Find tournament by ID
    async fn tournament(&mut self, id: TournamentId) -> EngineResult<Option<Tournament>>;

    /// Find tournament by ID and hold its row lock until the transaction ends
    async fn lock_tournament(&mut self, id: TournamentId) -> EngineResult<Option<Tournament>>;

    /// Page of tournaments, newest first, with approved team counts
    async fn list_tournaments(
        &mut self,
        filter: &TournamentFilter,
        limit: i64,
        offset: i64,
    ) -> EngineResult<Vec<TournamentSummary>>;

    /// Persist every mutable tournament field
    async fn update_tournament(&mut self, tournament: &Tournament) -> EngineResult<()>;

    // Teams

    async fn team(&mut self, id: TeamId) -> EngineResult<Option<Team>>;

    /// Teams in the order of `ids`; unknown IDs are skipped
    async fn teams(&mut self, ids: &[TeamId]) -> EngineResult<Vec<Team>>;

    // Participants

    async fn participant(
        &mut self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> EngineResult<Option<Participant>>;

    /// Insert a PENDING participation request
    async fn insert_participant(
        &mut self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> EngineResult<Participant>;

    async fn set_participant_status(
        &mut self,
        tournament_id: TournamentId,
        team_id: TeamId,
        status: ParticipantStatus,
    ) -> EngineResult<()>;

    /// Participants in request order, optionally filtered by status
    async fn participants(
        &mut self,
        tournament_id: TournamentId,
        status: Option<ParticipantStatus>,
    ) -> EngineResult<Vec<Participant>>;

    // Matches

    /// Insert matches in order; IDs increase in insertion order
    async fn insert_matches(
        &mut self,
        tournament_id: TournamentId,
        matches: &[NewMatch],
    ) -> EngineResult<Vec<Match>>;

    async fn match_by_id(&mut self, id: MatchId) -> EngineResult<Option<Match>>;

    /// Matches of a tournament in creation order, optionally for one stage
    async fn matches(
        &mut self,
        tournament_id: TournamentId,
        stage: Option<Stage>,
    ) -> EngineResult<Vec<Match>>;

    /// Matches of one round in creation order
    async fn round_matches(
        &mut self,
        tournament_id: TournamentId,
        stage: Stage,
        round_name: &str,
    ) -> EngineResult<Vec<Match>>;

    async fn round_exists(
        &mut self,
        tournament_id: TournamentId,
        stage: Stage,
        round_name: &str,
    ) -> EngineResult<bool>;

    async fn update_match_state(&mut self, id: MatchId, state: &MatchState) -> EngineResult<()>;

    /// Every match with both teams set, by schedule
    async fn bettable_matches(&mut self) -> EngineResult<Vec<Match>>;

    // Users and points

    async fn user(&mut self, id: UserId) -> EngineResult<Option<UserAccount>>;

    /// Subtract points if the balance covers them; `None` when it does not
    async fn debit_points(&mut self, change: &PointsChange) -> EngineResult<Option<i64>>;

    /// Add points, returning the new balance
    async fn credit_points(&mut self, change: &PointsChange) -> EngineResult<i64>;

    /// Latest ledger entries first
    async fn points_history(&mut self, user_id: UserId, limit: i64)
    -> EngineResult<Vec<PointsEntry>>;

    // Predictions

    /// Insert a pending prediction
    async fn insert_prediction(&mut self, new: &NewPrediction) -> EngineResult<Prediction>;

    async fn prediction_for(
        &mut self,
        user_id: UserId,
        match_id: MatchId,
    ) -> EngineResult<Option<Prediction>>;

    /// Predictions on a match in creation order, optionally filtered by status
    async fn predictions_for_match(
        &mut self,
        match_id: MatchId,
        status: Option<PredictionStatus>,
    ) -> EngineResult<Vec<Prediction>>;

    /// A user's predictions, newest first
    async fn predictions_for_user(&mut self, user_id: UserId) -> EngineResult<Vec<Prediction>>;

    async fn settle_prediction(
        &mut self,
        id: PredictionId,
        status: PredictionStatus,
        payout: i64,
    ) -> EngineResult<()>;

    /// Make every change of this transaction visible
    async fn commit(self: Box<Self>) -> EngineResult<()>;
}
