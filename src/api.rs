// src/api.rs
// JSON over HTTP. Handlers lock the connection, call the service, release.

use crate::error::SchedulerError;
use crate::models::{
    AppState, AttemptEntry, Difficulty, Outcome, Problem, ProblemFilter, ProgressFilter,
    ProgressRecord, ProgressView, Stats,
};
use crate::service;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/problems", get(list_problems))
        .route(
            "/users/{user_id}/problems",
            get(list_user_problems).post(create_tracking),
        )
        .route(
            "/users/{user_id}/problems/{record_id}/outcome",
            post(report_outcome),
        )
        .route(
            "/users/{user_id}/problems/{record_id}/attempts",
            get(list_attempts),
        )
        .route("/users/{user_id}/dashboard", get(dashboard))
        .route("/users/{user_id}/stats", get(stats))
        .with_state(state)
}

pub async fn serve(state: SharedState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}

// --- Errors ---

impl IntoResponse for SchedulerError {
    fn into_response(self) -> Response {
        let status = match &self {
            SchedulerError::NotFound { .. } | SchedulerError::ProblemNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            SchedulerError::AlreadyTracked { .. } => StatusCode::CONFLICT,
            SchedulerError::InvalidOutcome(_) | SchedulerError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            SchedulerError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if self.is_caller_error() {
            warn!("[API] {} ({})", self, status);
        }

        (
            status,
            Json(serde_json::json!({
                "error": self.kind(),
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

fn invalid_body(rejection: JsonRejection) -> SchedulerError {
    SchedulerError::InvalidRequest(rejection.body_text())
}

fn invalid_path(rejection: PathRejection) -> SchedulerError {
    SchedulerError::InvalidRequest(rejection.body_text())
}

fn invalid_query(rejection: QueryRejection) -> SchedulerError {
    SchedulerError::InvalidRequest(rejection.body_text())
}

// Raw `key=value` pairs; keeps repeated keys such as `tags=a&tags=b`.
type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

// --- Query Parsing ---

#[derive(Debug, Default)]
pub struct ProblemQuery {
    difficulty: Option<String>,
    tags: Vec<String>,
}

impl ProblemQuery {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut q = ProblemQuery::default();
        for (key, value) in pairs {
            match key.as_str() {
                "difficulty" => q.difficulty = Some(value),
                "tags" => q.tags.push(value),
                _ => {}
            }
        }
        q
    }
}

#[derive(Debug, Default)]
pub struct ProgressQuery {
    difficulty: Option<String>,
    tags: Vec<String>,
    confidence: Option<String>,
    due_today: Option<String>,
}

impl ProgressQuery {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut q = ProgressQuery::default();
        for (key, value) in pairs {
            match key.as_str() {
                "difficulty" => q.difficulty = Some(value),
                "tags" => q.tags.push(value),
                "confidence" => q.confidence = Some(value),
                "due_today" => q.due_today = Some(value),
                _ => {}
            }
        }
        q
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_difficulty(value: &Option<String>) -> Result<Option<Difficulty>, SchedulerError> {
    non_empty(value).map(str::parse::<Difficulty>).transpose()
}

// Each value may itself be a comma-separated list.
fn parse_tags(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

impl TryFrom<ProblemQuery> for ProblemFilter {
    type Error = SchedulerError;
    fn try_from(q: ProblemQuery) -> Result<Self, Self::Error> {
        Ok(ProblemFilter {
            difficulty: parse_difficulty(&q.difficulty)?,
            tags: parse_tags(&q.tags),
        })
    }
}

impl TryFrom<ProgressQuery> for ProgressFilter {
    type Error = SchedulerError;
    fn try_from(q: ProgressQuery) -> Result<Self, Self::Error> {
        let min_confidence = non_empty(&q.confidence)
            .map(|c| {
                c.parse::<i64>().map_err(|_| {
                    SchedulerError::InvalidRequest(format!("confidence must be an integer, got '{}'", c))
                })
            })
            .transpose()?;

        let due_today = match non_empty(&q.due_today) {
            None | Some("false") => false,
            Some("true") => true,
            Some(other) => {
                return Err(SchedulerError::InvalidRequest(format!(
                    "due_today must be true or false, got '{}'",
                    other
                )))
            }
        };

        Ok(ProgressFilter {
            difficulty: parse_difficulty(&q.difficulty)?,
            tags: parse_tags(&q.tags),
            min_confidence,
            due_today,
        })
    }
}

// --- Bodies ---

#[derive(Deserialize, Debug)]
pub struct CreateTrackingBody {
    pub problem_id: i64,
}

#[derive(Deserialize, Debug)]
pub struct OutcomeBody {
    // Any JSON value, so a wrong type is still reported as a bad outcome.
    pub outcome: serde_json::Value,
}

impl OutcomeBody {
    fn outcome(&self) -> Result<Outcome, SchedulerError> {
        match &self.outcome {
            serde_json::Value::String(s) => s.parse(),
            other => Err(SchedulerError::InvalidOutcome(other.to_string())),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct DashboardResponse {
    pub due_today: Vec<ProgressView>,
    pub total_due: usize,
}

// --- Handlers ---

async fn health() -> &'static str {
    "ok"
}

async fn list_problems(
    State(state): State<SharedState>,
    query: QueryPairs,
) -> Result<Json<Vec<Problem>>, SchedulerError> {
    let Query(pairs) = query.map_err(invalid_query)?;
    let filter = ProblemFilter::try_from(ProblemQuery::from_pairs(pairs))?;
    let conn = state.db.lock()?;
    Ok(Json(service::list_problems(&conn, &filter)?))
}

async fn list_user_problems(
    State(state): State<SharedState>,
    path: Result<Path<i64>, PathRejection>,
    query: QueryPairs,
) -> Result<Json<Vec<ProgressView>>, SchedulerError> {
    let Path(user_id) = path.map_err(invalid_path)?;
    let Query(pairs) = query.map_err(invalid_query)?;
    let filter = ProgressFilter::try_from(ProgressQuery::from_pairs(pairs))?;
    let conn = state.db.lock()?;
    Ok(Json(service::list_user_progress(
        &conn,
        user_id,
        &filter,
        Utc::now(),
    )?))
}

async fn create_tracking(
    State(state): State<SharedState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<CreateTrackingBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ProgressRecord>), SchedulerError> {
    let Path(user_id) = path.map_err(invalid_path)?;
    let Json(body) = body.map_err(invalid_body)?;
    let mut conn = state.db.lock()?;
    let record = service::add_tracking(&mut conn, user_id, body.problem_id, Utc::now())?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn report_outcome(
    State(state): State<SharedState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
    body: Result<Json<OutcomeBody>, JsonRejection>,
) -> Result<Json<ProgressRecord>, SchedulerError> {
    let Path((user_id, record_id)) = path.map_err(invalid_path)?;
    let Json(body) = body.map_err(invalid_body)?;
    let outcome = body.outcome()?;
    let mut conn = state.db.lock()?;
    Ok(Json(service::report_outcome(
        &mut conn,
        user_id,
        record_id,
        outcome,
        Utc::now(),
    )?))
}

async fn list_attempts(
    State(state): State<SharedState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Json<Vec<AttemptEntry>>, SchedulerError> {
    let Path((user_id, record_id)) = path.map_err(invalid_path)?;
    let conn = state.db.lock()?;
    Ok(Json(service::list_attempts(&conn, user_id, record_id)?))
}

async fn dashboard(
    State(state): State<SharedState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DashboardResponse>, SchedulerError> {
    let Path(user_id) = path.map_err(invalid_path)?;
    let conn = state.db.lock()?;
    let due_today = service::list_due_today(&conn, user_id, Utc::now())?;
    Ok(Json(DashboardResponse {
        total_due: due_today.len(),
        due_today,
    }))
}

async fn stats(
    State(state): State<SharedState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Stats>, SchedulerError> {
    let Path(user_id) = path.map_err(invalid_path)?;
    let conn = state.db.lock()?;
    Ok(Json(service::get_stats(&conn, user_id, Utc::now())?))
}
