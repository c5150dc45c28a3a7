use axum::{Json, extract::State};

use screener_core::api::{CompareRequest, ComparisonResponse};

use crate::SharedState;
use crate::auth::ApiKeyAuth;
use crate::error::ApiError;

/// 求人ごとの失敗は 200 の結果内に `failed` として返す
pub async fn compare_jobs(
    State(state): State<SharedState>,
    _auth: ApiKeyAuth,
    Json(request): Json<CompareRequest>,
) -> Result<Json<ComparisonResponse>, ApiError> {
    let comparison = state
        .pipeline
        .compare_jobs(request.resume_id, &request.resume_text, request.jobs)
        .await?;

    Ok(Json(ComparisonResponse::from(&comparison)))
}
