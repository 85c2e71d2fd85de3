//! Match API handlers.
//!
//! Reporting a result is the one write that fans out: it settles the bets on
//! the match and may generate the next bracket round or crown a champion.
//!
//! ```bash
//! curl -X PUT http://localhost:8080/api/v1/matches/12/result \
//!   -H "x-user-id: 1" \
//!   -H "Content-Type: application/json" \
//!   -d '{"team_a_score": 1, "team_b_score": 1, "winner_team_id": 7}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tourney_core::{
    prediction::MatchDetail,
    schedule::MatchId,
    tournament::{Advancement, ResultOutcome, TeamId},
};

use super::{
    AppState,
    error::ApiResult,
    middleware::{Caller, Viewer},
};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct ReportResultRequest {
    pub team_a_score: i32,
    pub team_b_score: i32,
    /// Required only to break a level score in a bracket match
    pub winner_team_id: Option<TeamId>,
}

/// Match with teams, pool and betting window; includes the viewer's balance when known
pub async fn get_match(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<MatchId>,
) -> ApiResult<MatchDetail> {
    Ok(Json(state.tournaments.get_match(id, viewer).await?))
}

/// Report a final score (manager only)
pub async fn report_result(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Path(id): Path<MatchId>,
    Json(req): Json<ReportResultRequest>,
) -> ApiResult<ResultOutcome> {
    let outcome = state
        .tournaments
        .report_result(
            user_id,
            id,
            req.team_a_score,
            req.team_b_score,
            req.winner_team_id,
        )
        .await?;

    metrics::results_reported_total(outcome.match_.stage.as_str());
    metrics::points_paid_out(outcome.settlement.paid_out, outcome.settlement.house_take);
    match &outcome.advancement {
        Advancement::NextRound { round_name, .. } => {
            metrics::rounds_generated_total();
            tracing::info!(match_id = id, round = %round_name, "Next round generated");
        }
        Advancement::Champion { team_id } => {
            tracing::info!(match_id = id, champion = team_id, "Tournament decided");
        }
        _ => {}
    }

    Ok(Json(outcome))
}
