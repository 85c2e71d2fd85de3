//! HTTP API for the tournament server.
//!
//! # Modules
//!
//! - [`tournaments`]: Lifecycle, participants, standings and brackets
//! - [`matches`]: Match detail and result reporting
//! - [`predictions`]: Betting board, placing predictions and the points ledger
//! - [`middleware`]: Caller identity from the `x-user-id` header
//! - [`request_id`]: Request correlation and access logging
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health
//! GET  /api/v1/tournaments                            - List (public)
//! GET  /api/v1/tournaments/{id}                       - Detail (public)
//! GET  /api/v1/tournaments/{id}/participants          - Participants (public)
//! GET  /api/v1/tournaments/{id}/standings             - League tables (public)
//! GET  /api/v1/tournaments/{id}/bracket               - Bracket rounds (public)
//! GET  /api/v1/tournaments/{id}/league-matches        - League fixtures (public)
//! GET  /api/v1/matches/{id}                           - Match detail (public)
//! GET  /api/v1/predictions/board                      - Betting board (public)
//! GET  /api/v1/predictions/matches/{id}/stats         - Pool statistics (public)
//! POST /api/v1/tournaments                            - Create (caller)
//! PUT  /api/v1/tournaments/{id}                       - Update settings (manager)
//! POST /api/v1/tournaments/{id}/join                  - Join request (caller)
//! POST /api/v1/tournaments/{id}/participants/{team}/approve|reject
//! POST /api/v1/tournaments/{id}/close-recruitment     - (manager)
//! POST /api/v1/tournaments/{id}/start                 - Random draw (manager)
//! POST /api/v1/tournaments/{id}/manual-bracket        - Hand-made draw (manager)
//! POST /api/v1/tournaments/{id}/playoff               - Hybrid cutover (manager)
//! POST /api/v1/tournaments/{id}/finish                - End a league (manager)
//! PUT  /api/v1/matches/{id}/result                    - Report result (manager)
//! POST /api/v1/predictions                            - Place prediction (caller)
//! GET  /api/v1/predictions/mine                       - Own predictions (caller)
//! GET  /api/v1/points                                 - Balance and history (caller)
//! ```
//!
//! The caller is identified by the `x-user-id` header, set by the
//! authenticating proxy in front of this server.

pub mod error;
pub mod matches;
pub mod middleware;
pub mod predictions;
pub mod request_id;
pub mod tournaments;

pub use error::ApiError;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use serde_json::json;
use std::sync::Arc;
use tourney_core::{
    Clock, Database, EngineConfig, PredictionManager, Store, TournamentManager,
};
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub tournaments: Arc<TournamentManager>,
    pub predictions: Arc<PredictionManager>,
    /// Pooled database for health checks; absent when serving from memory
    pub database: Option<Arc<Database>>,
}

impl AppState {
    /// Build both managers over one store and clock
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
        database: Option<Arc<Database>>,
    ) -> Self {
        Self {
            tournaments: Arc::new(TournamentManager::new(
                store.clone(),
                clock.clone(),
                config.clone(),
            )),
            predictions: Arc::new(PredictionManager::new(store, clock, config)),
            database,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use tourney_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router();

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(middleware::caller_middleware))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Versioned endpoints; handlers taking [`middleware::Caller`] reject anonymous requests
fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/tournaments",
            get(tournaments::list_tournaments).post(tournaments::create_tournament),
        )
        .route(
            "/tournaments/{id}",
            get(tournaments::get_tournament).put(tournaments::update_settings),
        )
        .route("/tournaments/{id}/join", post(tournaments::join_tournament))
        .route(
            "/tournaments/{id}/participants",
            get(tournaments::list_participants),
        )
        .route(
            "/tournaments/{id}/participants/{team_id}/approve",
            post(tournaments::approve_participant),
        )
        .route(
            "/tournaments/{id}/participants/{team_id}/reject",
            post(tournaments::reject_participant),
        )
        .route(
            "/tournaments/{id}/close-recruitment",
            post(tournaments::close_recruitment),
        )
        .route("/tournaments/{id}/start", post(tournaments::start_tournament))
        .route(
            "/tournaments/{id}/manual-bracket",
            post(tournaments::create_manual_bracket),
        )
        .route("/tournaments/{id}/playoff", post(tournaments::start_playoff))
        .route("/tournaments/{id}/finish", post(tournaments::finish_league))
        .route("/tournaments/{id}/standings", get(tournaments::get_standings))
        .route("/tournaments/{id}/bracket", get(tournaments::get_bracket))
        .route(
            "/tournaments/{id}/league-matches",
            get(tournaments::get_league_matches),
        )
        .route("/matches/{id}", get(matches::get_match))
        .route("/matches/{id}/result", put(matches::report_result))
        .route("/predictions", post(predictions::create_prediction))
        .route("/predictions/board", get(predictions::betting_board))
        .route("/predictions/mine", get(predictions::my_predictions))
        .route(
            "/predictions/matches/{id}/stats",
            get(predictions::match_statistics),
        )
        .route("/points", get(predictions::points))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database answers (or no database is configured),
/// `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","database":true,"version":"1.0.0","timestamp":"2025-11-22T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match &state.database {
        Some(db) => db.health_check().await.is_ok(),
        None => true,
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
