//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

use crate::{
    error::TimerError,
    state::{AppState, TaskId, TimerConfigInput, TimerSnapshot},
};
use super::responses::{
    ApiResponse, HealthResponse, SelectTaskRequest, SettingsResponse, StatusResponse,
};

fn internal_error(action: &str, e: TimerError) -> StatusCode {
    error!("Failed to {}: {}", action, e);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Handle POST /timer/start
pub async fn start_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    let timer = state.start().map_err(|e| internal_error("start timer", e))?;
    info!("Start endpoint called - {} phase, {}s remaining", timer.phase.as_str(), timer.remaining_seconds);
    Ok(Json(ApiResponse::new("Timer started", timer)))
}

/// Handle POST /timer/pause
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    let timer = state.pause().map_err(|e| internal_error("pause timer", e))?;
    info!("Pause endpoint called - {}s remaining", timer.remaining_seconds);
    Ok(Json(ApiResponse::new("Timer paused", timer)))
}

/// Handle POST /timer/reset
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    let timer = state.reset().map_err(|e| internal_error("reset timer", e))?;
    info!("Reset endpoint called");
    Ok(Json(ApiResponse::new("Timer reset", timer)))
}

/// Handle POST /timer/reset-cycles - Start a new set from the first focus phase
pub async fn reset_cycles_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    let timer = state.reset_cycles().map_err(|e| internal_error("reset cycles", e))?;
    info!("Reset-cycles endpoint called");
    Ok(Json(ApiResponse::new("Cycle counter reset", timer)))
}

/// Handle POST /timer/complete - End the current phase now
pub async fn complete_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    let timer = state.complete().map_err(|e| internal_error("complete phase", e))?;
    info!("Complete endpoint called - now in {} phase", timer.phase.as_str());
    Ok(Json(ApiResponse::new("Phase completed", timer)))
}

/// Handle GET /settings
pub async fn get_settings_handler(State(state): State<Arc<AppState>>) -> Result<Json<SettingsResponse>, StatusCode> {
    let settings = state.config().map_err(|e| internal_error("read settings", e))?;
    Ok(Json(SettingsResponse::new(settings)))
}

/// Handle PUT /settings - Invalid fields are replaced by their defaults
pub async fn update_settings_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<TimerConfigInput>,
) -> Result<Json<SettingsResponse>, StatusCode> {
    let settings = state
        .update_config(&input)
        .map_err(|e| internal_error("update settings", e))?;
    Ok(Json(SettingsResponse::new(settings)))
}

/// Handle POST /task - Associate a task with the timer, or clear it
pub async fn select_task_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectTaskRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    let task = request.task_id.as_deref().and_then(TaskId::parse);
    let message = match &task {
        Some(task) => format!("Task {} selected", task),
        None => "Task cleared".to_string(),
    };

    let timer = state
        .select_task(task)
        .map_err(|e| internal_error("select task", e))?;
    Ok(Json(ApiResponse::new(message, timer)))
}

/// Handle GET /status - Return current timer status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let timer = state.snapshot().map_err(|e| internal_error("get timer state", e))?;

    Ok(Json(StatusResponse {
        timer,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
    }))
}

/// Handle GET /events - Server-sent stream of transitions, ticks and notices
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let timer_events = broadcast_events(state.subscribe_events(), "timer");
    let notices = broadcast_events(state.subscribe_notices(), "notice");
    let ticks = snapshot_events(state.watch_snapshot());

    Sse::new(stream::select(timer_events, stream::select(notices, ticks)))
        .keep_alive(KeepAlive::default())
}

fn broadcast_events<T>(
    rx: broadcast::Receiver<T>,
    name: &'static str,
) -> impl Stream<Item = Result<Event, axum::Error>>
where
    T: Serialize + Clone + Send + 'static,
{
    stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(item) => return Some((Event::default().event(name).json_data(&item), rx)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event stream lagged, skipped {} {} events", skipped, name);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}

fn snapshot_events(
    rx: watch::Receiver<TimerSnapshot>,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    stream::unfold(rx, |mut rx| async move {
        rx.changed().await.ok()?;
        let snapshot = rx.borrow_and_update().clone();
        Some((Event::default().event("tick").json_data(&snapshot), rx))
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
