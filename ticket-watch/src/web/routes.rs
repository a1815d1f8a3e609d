//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use tracing::{error, info, warn};

use crate::domain::{
    CommutePreference, DomainError, PreferenceDraft, PreferenceError, UserId, WatchTaskId,
};
use crate::poller::AvailabilitySnapshot;
use crate::purchase::{CallbackOutcome, OrchestratorError};
use crate::stations::StationError;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stations/search", get(search_stations))
        .route("/api/stations/resolve", get(resolve_station))
        .route(
            "/api/users/:user_id/preference",
            put(set_preference).delete(clear_preference),
        )
        .route("/api/users/:user_id/availability", get(availability))
        .route("/api/watch-tasks", post(create_watch_task))
        .route("/api/watch-tasks/:id", get(get_watch_task))
        .route("/api/watch-tasks/:id/trigger", post(trigger_watch_task))
        .route("/api/watch-tasks/:id/stop", post(stop_watch_task))
        .route("/api/rpa/callback", post(rpa_callback))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Search stations by name, pinyin or acronym.
async fn search_stations(
    State(state): State<AppState>,
    Query(req): Query<StationSearchRequest>,
) -> Json<StationSearchResponse> {
    if let Err(e) = state.directory.load().await {
        warn!(error = %e, "station list unavailable for search");
    }

    let limit = req.limit.unwrap_or(10).min(50);
    let stations = state.directory.search(&req.q, limit).await;

    Json(StationSearchResponse { stations })
}

/// Resolve an exact station name to its code.
async fn resolve_station(
    State(state): State<AppState>,
    Query(req): Query<ResolveRequest>,
) -> Result<Json<ResolveResponse>, AppError> {
    let code = state.directory.resolve(&req.name).await?;
    Ok(Json(ResolveResponse {
        name: req.name,
        code,
    }))
}

/// Save a commute preference and (re)start the user's poller.
async fn set_preference(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(draft): Json<PreferenceDraft>,
) -> Result<Json<PreferenceResponse>, AppError> {
    let preference = CommutePreference::try_from(draft)?;
    let replaced = state.pollers.start(&user_id, preference.clone()).await;

    Ok(Json(PreferenceResponse {
        user_id,
        preference,
        replaced,
    }))
}

/// Stop the user's poller.
async fn clear_preference(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<StatusCode, AppError> {
    if state.pollers.stop(&user_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound {
            message: format!("no commute preference for user {user_id}"),
        })
    }
}

/// Latest availability snapshot for a user.
async fn availability(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<AvailabilitySnapshot>, AppError> {
    if !state.pollers.is_running(&user_id).await {
        return Err(AppError::NotFound {
            message: format!("no commute preference for user {user_id}"),
        });
    }

    let snapshot = state
        .pollers
        .snapshot(&user_id)
        .await
        .ok_or_else(|| AppError::NotFound {
            message: format!("no availability yet for user {user_id}"),
        })?;

    Ok(Json(snapshot.as_ref().clone()))
}

async fn create_watch_task(
    State(state): State<AppState>,
    Json(req): Json<CreateWatchTaskRequest>,
) -> Result<(StatusCode, Json<WatchTaskResponse>), AppError> {
    let request = req
        .into_watch_request()
        .map_err(|message| AppError::BadRequest { message })?;
    let task = state.orchestrator.create(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(WatchTaskResponse {
            task,
            rpa_tasks: Vec::new(),
        }),
    ))
}

async fn get_watch_task(
    State(state): State<AppState>,
    Path(id): Path<WatchTaskId>,
) -> Result<Json<WatchTaskResponse>, AppError> {
    let task = state.orchestrator.watch_task(id).await?;
    let rpa_tasks = state.orchestrator.rpa_tasks(id).await?;
    Ok(Json(WatchTaskResponse { task, rpa_tasks }))
}

/// Hand the watch task to the automation provider.
async fn trigger_watch_task(
    State(state): State<AppState>,
    Path(id): Path<WatchTaskId>,
) -> Result<Json<WatchTaskResponse>, AppError> {
    let run = state.orchestrator.trigger(id).await?;
    info!(watch_task = %id, rpa_task = %run.id, status = ?run.status, "trigger handled");

    let task = state.orchestrator.watch_task(id).await?;
    let rpa_tasks = state.orchestrator.rpa_tasks(id).await?;
    Ok(Json(WatchTaskResponse { task, rpa_tasks }))
}

async fn stop_watch_task(
    State(state): State<AppState>,
    Path(id): Path<WatchTaskId>,
) -> Result<Json<WatchTaskResponse>, AppError> {
    let task = state.orchestrator.stop(id).await?;
    let rpa_tasks = state.orchestrator.rpa_tasks(id).await?;
    Ok(Json(WatchTaskResponse { task, rpa_tasks }))
}

/// Outcome report from the automation provider.
async fn rpa_callback(
    State(state): State<AppState>,
    Json(req): Json<CallbackRequest>,
) -> Result<Json<CallbackOutcome>, AppError> {
    let outcome = state
        .orchestrator
        .on_callback(req.task_id, req.success, req.error_message)
        .await?;
    Ok(Json(outcome))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Conflict { message: String },
    Internal { message: String },
}

impl From<OrchestratorError> for AppError {
    fn from(e: OrchestratorError) -> Self {
        let message = e.to_string();
        match e {
            OrchestratorError::WatchTaskNotFound(_) | OrchestratorError::RpaTaskNotFound(_) => {
                AppError::NotFound { message }
            }
            OrchestratorError::NotActive { .. }
            | OrchestratorError::DuplicatePurchase { .. }
            | OrchestratorError::Domain(DomainError::InvalidTransition { .. }) => {
                AppError::Conflict { message }
            }
            OrchestratorError::InvalidRequest(_)
            | OrchestratorError::Domain(DomainError::NoPreferredTrain) => {
                AppError::BadRequest { message }
            }
            OrchestratorError::Store(_) => AppError::Internal { message },
        }
    }
}

impl From<PreferenceError> for AppError {
    fn from(e: PreferenceError) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl From<StationError> for AppError {
    fn from(e: StationError) -> Self {
        match e {
            StationError::NotFound { .. } => AppError::NotFound {
                message: e.to_string(),
            },
            _ => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Conflict { message } => (StatusCode::CONFLICT, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            info!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
