//! In-memory store.
//!
//! Holds all state behind one async mutex. A transaction owns the lock for its
//! whole lifetime and works on a copy; commit swaps the copy in, drop discards
//! it. Transactions are therefore fully serialized.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::repository::{Store, StoreTx};
use crate::errors::{EngineError, EngineResult};
use crate::points::{PointsChange, PointsEntry, UserAccount};
use crate::prediction::{NewPrediction, Prediction, PredictionId, PredictionStatus};
use crate::schedule::{Match, MatchId, MatchState, NewMatch, Stage};
use crate::tournament::{
    NewTournament, Participant, ParticipantStatus, Sport, Team, TeamId, Tournament,
    TournamentFilter, TournamentId, TournamentStatus, TournamentSummary, UserId,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_id: i64,
    tournaments: BTreeMap<TournamentId, Tournament>,
    teams: BTreeMap<TeamId, Team>,
    /// Request order
    participants: Vec<Participant>,
    matches: BTreeMap<MatchId, Match>,
    users: BTreeMap<UserId, UserAccount>,
    predictions: BTreeMap<PredictionId, Prediction>,
    ledger: Vec<PointsEntry>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn append_entry(&mut self, change: &PointsChange, balance_after: i64) {
        let id = self.next_id();
        self.ledger.push(PointsEntry {
            id,
            user_id: change.user_id,
            amount: change.amount,
            balance_after,
            direction: change.entry_type.direction(),
            entry_type: change.entry_type,
            match_id: change.match_id,
            prediction_id: change.prediction_id,
            created_at: Utc::now(),
        });
    }
}

/// Store keeping everything in process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a team roster entry
    pub async fn add_team(&self, name: &str, sport: Sport) -> TeamId {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.teams.insert(
            id,
            Team {
                id,
                name: name.to_string(),
                sport,
            },
        );
        id
    }

    /// Register a user account with a starting balance
    pub async fn add_user(&self, username: &str, points: i64) -> UserId {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.users.insert(
            id,
            UserAccount {
                id,
                username: username.to_string(),
                points,
            },
        );
        id
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> EngineResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_tournament(
        &mut self,
        manager_id: UserId,
        new: &NewTournament,
        invite_code: Option<String>,
    ) -> EngineResult<Tournament> {
        let id = self.working.next_id();
        let tournament = Tournament {
            id,
            name: new.name.clone(),
            sport: new.sport,
            description: new.description.clone(),
            is_private: new.is_private,
            invite_code,
            manager_id,
            format: new.format,
            status: TournamentStatus::Recruiting,
            target_team_count: new.target_team_count,
            start_date: new.start_date,
            end_date: new.end_date,
            bracket_generation: None,
            created_at: Utc::now(),
        };
        self.working.tournaments.insert(id, tournament.clone());
        Ok(tournament)
    }

    async fn tournament(&mut self, id: TournamentId) -> EngineResult<Option<Tournament>> {
        Ok(self.working.tournaments.get(&id).cloned())
    }

    async fn lock_tournament(&mut self, id: TournamentId) -> EngineResult<Option<Tournament>> {
        // The transaction already holds the store-wide lock
        self.tournament(id).await
    }

    async fn list_tournaments(
        &mut self,
        filter: &TournamentFilter,
        limit: i64,
        offset: i64,
    ) -> EngineResult<Vec<TournamentSummary>> {
        let mut rows: Vec<&Tournament> = self
            .working
            .tournaments
            .values()
            .filter(|t| filter.status.is_none_or(|phase| t.status.phase() == phase))
            .filter(|t| filter.sport.is_none_or(|sport| t.sport == sport))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let summaries = rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|t| TournamentSummary {
                tournament: t.clone(),
                approved_teams: self
                    .working
                    .participants
                    .iter()
                    .filter(|p| p.tournament_id == t.id && p.status == ParticipantStatus::Approved)
                    .count() as i64,
            })
            .collect();
        Ok(summaries)
    }

    async fn update_tournament(&mut self, tournament: &Tournament) -> EngineResult<()> {
        let slot = self
            .working
            .tournaments
            .get_mut(&tournament.id)
            .ok_or(EngineError::TournamentNotFound(tournament.id))?;
        *slot = tournament.clone();
        Ok(())
    }

    async fn team(&mut self, id: TeamId) -> EngineResult<Option<Team>> {
        Ok(self.working.teams.get(&id).cloned())
    }

    async fn teams(&mut self, ids: &[TeamId]) -> EngineResult<Vec<Team>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.teams.get(id).cloned())
            .collect())
    }

    async fn participant(
        &mut self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> EngineResult<Option<Participant>> {
        Ok(self
            .working
            .participants
            .iter()
            .find(|p| p.tournament_id == tournament_id && p.team_id == team_id)
            .cloned())
    }

    async fn insert_participant(
        &mut self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> EngineResult<Participant> {
        if self.participant(tournament_id, team_id).await?.is_some() {
            return Err(EngineError::AlreadyJoined);
        }
        let participant = Participant {
            tournament_id,
            team_id,
            status: ParticipantStatus::Pending,
            requested_at: Utc::now(),
        };
        self.working.participants.push(participant.clone());
        Ok(participant)
    }

    async fn set_participant_status(
        &mut self,
        tournament_id: TournamentId,
        team_id: TeamId,
        status: ParticipantStatus,
    ) -> EngineResult<()> {
        let participant = self
            .working
            .participants
            .iter_mut()
            .find(|p| p.tournament_id == tournament_id && p.team_id == team_id)
            .ok_or(EngineError::ParticipantNotFound {
                tournament_id,
                team_id,
            })?;
        participant.status = status;
        Ok(())
    }

    async fn participants(
        &mut self,
        tournament_id: TournamentId,
        status: Option<ParticipantStatus>,
    ) -> EngineResult<Vec<Participant>> {
        Ok(self
            .working
            .participants
            .iter()
            .filter(|p| p.tournament_id == tournament_id)
            .filter(|p| status.is_none_or(|status| p.status == status))
            .cloned()
            .collect())
    }

    async fn insert_matches(
        &mut self,
        tournament_id: TournamentId,
        matches: &[NewMatch],
    ) -> EngineResult<Vec<Match>> {
        let mut inserted = Vec::with_capacity(matches.len());
        for new in matches {
            let id = self.working.next_id();
            let m = new.clone().into_match(id, tournament_id);
            self.working.matches.insert(id, m.clone());
            inserted.push(m);
        }
        Ok(inserted)
    }

    async fn match_by_id(&mut self, id: MatchId) -> EngineResult<Option<Match>> {
        Ok(self.working.matches.get(&id).cloned())
    }

    async fn matches(
        &mut self,
        tournament_id: TournamentId,
        stage: Option<Stage>,
    ) -> EngineResult<Vec<Match>> {
        Ok(self
            .working
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .filter(|m| stage.is_none_or(|stage| m.stage == stage))
            .cloned()
            .collect())
    }

    async fn round_matches(
        &mut self,
        tournament_id: TournamentId,
        stage: Stage,
        round_name: &str,
    ) -> EngineResult<Vec<Match>> {
        Ok(self
            .working
            .matches
            .values()
            .filter(|m| {
                m.tournament_id == tournament_id && m.stage == stage && m.round_name == round_name
            })
            .cloned()
            .collect())
    }

    async fn round_exists(
        &mut self,
        tournament_id: TournamentId,
        stage: Stage,
        round_name: &str,
    ) -> EngineResult<bool> {
        Ok(self.working.matches.values().any(|m| {
            m.tournament_id == tournament_id && m.stage == stage && m.round_name == round_name
        }))
    }

    async fn update_match_state(&mut self, id: MatchId, state: &MatchState) -> EngineResult<()> {
        let m = self
            .working
            .matches
            .get_mut(&id)
            .ok_or(EngineError::MatchNotFound(id))?;
        m.state = *state;
        Ok(())
    }

    async fn bettable_matches(&mut self) -> EngineResult<Vec<Match>> {
        let mut matches: Vec<Match> = self
            .working
            .matches
            .values()
            .filter(|m| m.both_teams().is_some())
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then(a.id.cmp(&b.id)));
        Ok(matches)
    }

    async fn user(&mut self, id: UserId) -> EngineResult<Option<UserAccount>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn debit_points(&mut self, change: &PointsChange) -> EngineResult<Option<i64>> {
        let user = self
            .working
            .users
            .get_mut(&change.user_id)
            .ok_or(EngineError::UserNotFound(change.user_id))?;
        if user.points < change.amount {
            return Ok(None);
        }
        user.points -= change.amount;
        let balance = user.points;
        self.working.append_entry(change, balance);
        Ok(Some(balance))
    }

    async fn credit_points(&mut self, change: &PointsChange) -> EngineResult<i64> {
        let user = self
            .working
            .users
            .get_mut(&change.user_id)
            .ok_or(EngineError::UserNotFound(change.user_id))?;
        let balance = user
            .points
            .checked_add(change.amount)
            .ok_or(EngineError::InvalidAmount(change.amount))?;
        user.points = balance;
        self.working.append_entry(change, balance);
        Ok(balance)
    }

    async fn points_history(
        &mut self,
        user_id: UserId,
        limit: i64,
    ) -> EngineResult<Vec<PointsEntry>> {
        Ok(self
            .working
            .ledger
            .iter()
            .rev()
            .filter(|entry| entry.user_id == user_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn insert_prediction(&mut self, new: &NewPrediction) -> EngineResult<Prediction> {
        if self.prediction_for(new.user_id, new.match_id).await?.is_some() {
            return Err(EngineError::AlreadyPredicted);
        }
        let id = self.working.next_id();
        let prediction = Prediction {
            id,
            match_id: new.match_id,
            user_id: new.user_id,
            predicted_team_id: new.predicted_team_id,
            bet_amount: new.bet_amount,
            status: PredictionStatus::Pending,
            payout: None,
            created_at: Utc::now(),
        };
        self.working.predictions.insert(id, prediction.clone());
        Ok(prediction)
    }

    async fn prediction_for(
        &mut self,
        user_id: UserId,
        match_id: MatchId,
    ) -> EngineResult<Option<Prediction>> {
        Ok(self
            .working
            .predictions
            .values()
            .find(|p| p.user_id == user_id && p.match_id == match_id)
            .cloned())
    }

    async fn predictions_for_match(
        &mut self,
        match_id: MatchId,
        status: Option<PredictionStatus>,
    ) -> EngineResult<Vec<Prediction>> {
        Ok(self
            .working
            .predictions
            .values()
            .filter(|p| p.match_id == match_id)
            .filter(|p| status.is_none_or(|status| p.status == status))
            .cloned()
            .collect())
    }

    async fn predictions_for_user(&mut self, user_id: UserId) -> EngineResult<Vec<Prediction>> {
        Ok(self
            .working
            .predictions
            .values()
            .rev()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn settle_prediction(
        &mut self,
        id: PredictionId,
        status: PredictionStatus,
        payout: i64,
    ) -> EngineResult<()> {
        let prediction = self
            .working
            .predictions
            .get_mut(&id)
            .ok_or_else(|| EngineError::Corrupt(format!("prediction {id} vanished")))?;
        prediction.status = status;
        prediction.payout = Some(payout);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> EngineResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
