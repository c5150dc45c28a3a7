use axum::{Json, extract::State};

use screener_core::api::{BatchRequest, BatchResponse};

use crate::SharedState;
use crate::auth::ApiKeyAuth;
use crate::error::ApiError;

/// シャットダウン開始時は未着手の履歴書を Cancelled として返す
pub async fn screen_batch(
    State(state): State<SharedState>,
    _auth: ApiKeyAuth,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    let cancel = state.shutdown.subscribe();
    let report = state
        .batch
        .screen_batch(request.job, request.resumes, cancel)
        .await?;

    Ok(Json(BatchResponse::from(&report)))
}
