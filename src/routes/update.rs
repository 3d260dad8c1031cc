//! Privileged update triggers, intended for a scheduled external caller
//! (cron), not end users.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::routes::AppState;
use crate::services::updater::{self, HighlightsOutcome, UpdateOutcome};

/// Status message returned by the update/enrichment/flush triggers.
#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateResponse {
    pub status: String,
}

/// Run the fetch-merge-persist pipeline for the latest race.
#[utoipa::path(
    get,
    path = "/api/update",
    tag = "Updates",
    responses(
        (status = 200, description = "Update ran; see status message", body = UpdateResponse),
        (status = 503, description = "A required upstream is unavailable", body = crate::errors::ErrorResponse),
        (status = 500, description = "The store did not acknowledge the write", body = crate::errors::ErrorResponse),
    )
)]
pub async fn trigger_update(State(state): State<AppState>) -> Result<Json<UpdateResponse>, AppError> {
    let outcome = updater::run_update(
        &state.ergast,
        &state.weather,
        &state.store,
        &state.tz,
        &state.cache,
    )
    .await?;

    let status = match outcome {
        UpdateOutcome::AlreadyUpToDate { season, round } => {
            format!("already up to date (season {} round {})", season, round)
        }
        UpdateOutcome::Ingested { season, round, .. } => {
            format!("ingested season {} round {}", season, round)
        }
    };
    Ok(Json(UpdateResponse { status }))
}

/// Search for a highlights clip and patch it onto the persisted record.
#[utoipa::path(
    get,
    path = "/api/update/highlights",
    tag = "Updates",
    responses(
        (status = 200, description = "Enrichment ran; see status message", body = UpdateResponse),
        (status = 503, description = "The video source or results provider is unavailable", body = crate::errors::ErrorResponse),
    )
)]
pub async fn trigger_highlights(
    State(state): State<AppState>,
) -> Result<Json<UpdateResponse>, AppError> {
    let outcome = updater::enrich_highlights(
        &state.ergast,
        &state.youtube,
        &state.store,
        &state.cache,
        state.clock.as_ref(),
    )
    .await?;

    let status = match outcome {
        HighlightsOutcome::Updated { uri } => format!("highlights set to {}", uri),
        HighlightsOutcome::NotFoundYet => "no highlights published yet".to_string(),
    };
    Ok(Json(UpdateResponse { status }))
}

/// Flush the freshness cache so the next read re-derives from the store.
#[utoipa::path(
    get,
    path = "/api/update/cache",
    tag = "Updates",
    responses(
        (status = 200, description = "Cache flushed", body = UpdateResponse),
    )
)]
pub async fn flush_cache(State(state): State<AppState>) -> Json<UpdateResponse> {
    state.cache.flush().await;
    tracing::info!("freshness cache flushed by trigger");
    Json(UpdateResponse {
        status: "cache flushed".to_string(),
    })
}
