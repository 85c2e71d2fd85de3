//! Prediction and points API handlers.
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/predictions \
//!   -H "x-user-id: 42" \
//!   -H "Content-Type: application/json" \
//!   -d '{"match_id": 12, "predicted_team_id": 7, "bet_amount": 100}'
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tourney_core::{
    points::{PointsEntry, UserAccount},
    prediction::{BettingMatch, MatchStatistics, Prediction, PredictionRecord},
    schedule::MatchId,
    tournament::TeamId,
};

use super::{
    AppState,
    error::ApiResult,
    middleware::{Caller, Viewer},
};
use crate::metrics;

const DEFAULT_HISTORY_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct CreatePredictionRequest {
    pub match_id: MatchId,
    pub predicted_team_id: TeamId,
    pub bet_amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PointsResponse {
    pub account: UserAccount,
    pub history: Vec<PointsEntry>,
}

/// Every match with two teams, with pools and the viewer's own stake
pub async fn betting_board(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> ApiResult<Vec<BettingMatch>> {
    Ok(Json(state.predictions.betting_board(viewer).await?))
}

/// Stake points on one side of a match
pub async fn create_prediction(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Json(req): Json<CreatePredictionRequest>,
) -> ApiResult<Prediction> {
    let prediction = state
        .predictions
        .create_prediction(user_id, req.match_id, req.predicted_team_id, req.bet_amount)
        .await?;
    metrics::prediction_placed(prediction.bet_amount);
    Ok(Json(prediction))
}

pub async fn my_predictions(
    State(state): State<AppState>,
    Caller(user_id): Caller,
) -> ApiResult<Vec<PredictionRecord>> {
    Ok(Json(state.predictions.my_predictions(user_id).await?))
}

pub async fn match_statistics(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<MatchStatistics> {
    Ok(Json(state.predictions.match_statistics(match_id).await?))
}

/// Balance with the latest ledger entries (`?limit=`, at most 100)
pub async fn points(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<PointsResponse> {
    let account = state.predictions.points_balance(user_id).await?;
    let history = state
        .predictions
        .points_history(user_id, query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await?;
    Ok(Json(PointsResponse { account, history }))
}
