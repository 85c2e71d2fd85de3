//! Tournament API handlers.
//!
//! Lifecycle endpoints (create, recruit, start, playoff, finish) and the public
//! read models (detail, participants, standings, bracket).
//!
//! # Examples
//!
//! Create a hybrid tournament:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments \
//!   -H "x-user-id: 1" \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Spring Cup", "sport": "Soccer",
//!        "format": {"kind": "HYBRID", "group_count": 2, "playoff_teams": 4}}'
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tourney_core::{
    schedule::Match,
    tournament::{
        BracketRound, LeagueStandings, ManualPairing, NewTournament, Participant,
        ParticipantDetail, ParticipantStatus, PlayoffOutcome, Sport, StartOutcome, TeamId,
        Tournament, TournamentDetail, TournamentFilter, TournamentFormat, TournamentId,
        TournamentSettings, TournamentSummary,
    },
};

use super::{AppState, error::ApiResult, middleware::Caller};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct CreateTournamentRequest {
    pub name: String,
    pub sport: Sport,
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default = "default_format")]
    pub format: TournamentFormat,
    pub target_team_count: Option<u32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

fn default_format() -> TournamentFormat {
    TournamentFormat::Tournament
}

impl From<CreateTournamentRequest> for NewTournament {
    fn from(req: CreateTournamentRequest) -> Self {
        NewTournament {
            name: req.name,
            sport: req.sport,
            description: req.description,
            is_private: req.is_private,
            format: req.format,
            target_team_count: req.target_team_count,
            start_date: req.start_date,
            end_date: req.end_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub team_id: TeamId,
    pub invite_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ParticipantQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ManualBracketRequest {
    pub pairings: Vec<ManualPairing>,
}

/// List tournaments, newest first
///
/// Query parameters: `status` (`RECRUITING`, `ONGOING`, `ENDED`), `sport`, `page`.
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(filter): Query<TournamentFilter>,
) -> ApiResult<Vec<TournamentSummary>> {
    Ok(Json(state.tournaments.list_tournaments(&filter).await?))
}

/// Create a tournament managed by the caller
pub async fn create_tournament(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Json(req): Json<CreateTournamentRequest>,
) -> ApiResult<Tournament> {
    let tournament = state
        .tournaments
        .create_tournament(user_id, req.into())
        .await?;
    logging::log_manager_action("create", user_id, tournament.id);
    Ok(Json(tournament))
}

pub async fn get_tournament(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<TournamentDetail> {
    Ok(Json(state.tournaments.get_tournament(id).await?))
}

/// Partial settings update (manager only)
pub async fn update_settings(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(id): Path<TournamentId>,
    Json(settings): Json<TournamentSettings>,
) -> ApiResult<Tournament> {
    Ok(Json(
        state
            .tournaments
            .update_settings(user_id, id, settings)
            .await?,
    ))
}

/// Request participation for a team
pub async fn join_tournament(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(id): Path<TournamentId>,
    Json(req): Json<JoinRequest>,
) -> ApiResult<Participant> {
    let participant = state
        .tournaments
        .join_tournament(id, req.team_id, req.invite_code.as_deref())
        .await?;
    tracing::info!(
        user_id = user_id,
        tournament_id = id,
        team_id = req.team_id,
        "Join requested"
    );
    Ok(Json(participant))
}

/// Participants with their teams; approved ones unless `?status=` says otherwise
pub async fn list_participants(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
    Query(query): Query<ParticipantQuery>,
) -> ApiResult<Vec<ParticipantDetail>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<ParticipantStatus>)
        .transpose()?;
    Ok(Json(state.tournaments.list_participants(id, status).await?))
}

pub async fn approve_participant(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path((id, team_id)): Path<(TournamentId, TeamId)>,
) -> ApiResult<Participant> {
    Ok(Json(
        state
            .tournaments
            .approve_participant(user_id, id, team_id)
            .await?,
    ))
}

pub async fn reject_participant(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path((id, team_id)): Path<(TournamentId, TeamId)>,
) -> ApiResult<Participant> {
    Ok(Json(
        state
            .tournaments
            .reject_participant(user_id, id, team_id)
            .await?,
    ))
}

pub async fn close_recruitment(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(id): Path<TournamentId>,
) -> ApiResult<Tournament> {
    let tournament = state.tournaments.close_recruitment(user_id, id).await?;
    logging::log_manager_action("close_recruitment", user_id, id);
    Ok(Json(tournament))
}

/// Random draw: shuffle approved teams and generate the first schedule
pub async fn start_tournament(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(id): Path<TournamentId>,
) -> ApiResult<StartOutcome> {
    let outcome = state.tournaments.start_tournament(user_id, id).await?;
    logging::log_manager_action("start", user_id, id);
    metrics::tournaments_started_total(outcome.tournament.format.as_str());
    Ok(Json(outcome))
}

/// Start with hand-made first-round pairings
pub async fn create_manual_bracket(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(id): Path<TournamentId>,
    Json(req): Json<ManualBracketRequest>,
) -> ApiResult<StartOutcome> {
    let outcome = state
        .tournaments
        .create_manual_bracket(user_id, id, req.pairings)
        .await?;
    logging::log_manager_action("manual_bracket", user_id, id);
    metrics::tournaments_started_total(outcome.tournament.format.as_str());
    Ok(Json(outcome))
}

pub async fn start_playoff(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(id): Path<TournamentId>,
) -> ApiResult<PlayoffOutcome> {
    let outcome = state.tournaments.start_playoff(user_id, id).await?;
    logging::log_manager_action("start_playoff", user_id, id);
    metrics::rounds_generated_total();
    Ok(Json(outcome))
}

pub async fn finish_league(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(id): Path<TournamentId>,
) -> ApiResult<Tournament> {
    let tournament = state.tournaments.finish_league(user_id, id).await?;
    logging::log_manager_action("finish_league", user_id, id);
    Ok(Json(tournament))
}

pub async fn get_standings(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<LeagueStandings> {
    Ok(Json(state.tournaments.get_standings(id).await?))
}

pub async fn get_bracket(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Vec<BracketRound>> {
    Ok(Json(state.tournaments.get_bracket(id).await?))
}

pub async fn get_league_matches(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Vec<Match>> {
    Ok(Json(state.tournaments.get_league_matches(id).await?))
}
