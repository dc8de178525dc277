//! Profile seeding and recommendation handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use kindred_core::{IngestReport, IngestStatus, RecommendationResult};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct SeedParams {
    /// Overrides the configured number of generated profiles.
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub message: String,
    pub report: IngestReport,
}

fn summary(report: &IngestReport) -> String {
    match report.status {
        IngestStatus::Skipped => format!(
            "Index '{}' already contains data, nothing imported",
            report.collection
        ),
        IngestStatus::Completed if report.batches_failed == 0 => format!(
            "Imported {} profiles in {} batches",
            report.total_records, report.batches_attempted
        ),
        IngestStatus::Completed => format!(
            "Import finished with {} of {} batches failed",
            report.batches_failed, report.batches_attempted
        ),
    }
}

/// `POST /users/create/fake-users[?count=N]`
///
/// Generates profiles and seeds the index unless it already holds data. Batch
/// failures are reported in the body with a 200; only a failed existence probe
/// is a server error. A `count` of 0 or above `max_count` is a 400.
pub async fn create_fake_users(
    State(state): State<AppState>,
    Query(params): Query<SeedParams>,
) -> Result<Json<SeedResponse>, ApiError> {
    let count = params.count.unwrap_or(state.default_count);
    if count == 0 || count > state.max_count {
        return Err(ApiError::BadRequest(format!(
            "count must be between 1 and {}, got {}",
            state.max_count, count
        )));
    }
    let provider = Arc::clone(&state.provider);
    let records = tokio::task::spawn_blocking(move || provider.profiles(count))
        .await
        .map_err(|e| ApiError::Internal(format!("profile generation failed: {}", e)))?;

    info!(count, "Seeding request received");
    let report = state.pipeline.ingest(records).await?;

    Ok(Json(SeedResponse {
        message: summary(&report),
        report,
    }))
}

/// `GET /users/recommendations/:user_id`
pub async fn recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<RecommendationResult>, ApiError> {
    let result = state.engine.recommend(&user_id).await?;
    Ok(Json(result))
}

/// `GET /users/recommendations/` with no id.
pub async fn missing_user_id() -> ApiError {
    ApiError::BadRequest("user id is required".to_string())
}
