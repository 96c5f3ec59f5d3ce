use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    error::AppError,
    state::AppState,
    stats::{
        self, ActionEvent, AggressionSummary, CityLeaderboard, ClaimEvent, HonestySummary,
        StreakAverage, SurvivalRate, WinAck, WinEvent,
    },
    streak::{self, RunAck, RunReport},
};

/// A body that does not parse as the expected shape is a validation failure,
/// same as a missing field.
fn parse<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|_| AppError::Validation("malformed request body".to_string()))
}

pub async fn report_streak(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RunReport>, JsonRejection>,
) -> Result<Json<RunAck>, AppError> {
    let report = parse(payload)?;
    Ok(Json(streak::ingest_run(state.store.as_ref(), report).await?))
}

pub async fn survival_rate(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SurvivalRate>, AppError> {
    Ok(Json(stats::survival_rate(state.store.as_ref()).await?))
}

pub async fn streak_average(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StreakAverage>, AppError> {
    Ok(Json(stats::streak_average(state.store.as_ref()).await?))
}

pub async fn honesty_rate(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HonestySummary>, AppError> {
    Ok(Json(stats::honesty_rate(state.store.as_ref()).await?))
}

pub async fn aggression_index(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AggressionSummary>, AppError> {
    Ok(Json(stats::aggression_index(state.store.as_ref()).await?))
}

pub async fn city_leaderboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CityLeaderboard>, AppError> {
    Ok(Json(stats::city_leaderboard(state.store.as_ref()).await?))
}

pub async fn record_claim(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ClaimEvent>, JsonRejection>,
) -> Result<Json<HonestySummary>, AppError> {
    let event = parse(payload)?;
    Ok(Json(stats::record_claim(state.store.as_ref(), event).await?))
}

pub async fn record_action(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ActionEvent>, JsonRejection>,
) -> Result<Json<AggressionSummary>, AppError> {
    let event = parse(payload)?;
    Ok(Json(stats::record_action(state.store.as_ref(), event).await?))
}

pub async fn record_win(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WinEvent>, JsonRejection>,
) -> Result<Json<WinAck>, AppError> {
    let event = parse(payload)?;
    Ok(Json(stats::record_win(state.store.as_ref(), event).await?))
}

/// Bulk reset is disabled in this version.
pub async fn admin_reset() -> AppError {
    AppError::Gone
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
