use axum::{Json, extract::State};
use chrono::Utc;

use screener_core::api::{ScreenRequest, ScreenResponse};
use screener_core::run_id;

use crate::SharedState;
use crate::auth::ApiKeyAuth;
use crate::error::ApiError;

pub async fn screen(
    State(state): State<SharedState>,
    _auth: ApiKeyAuth,
    Json(request): Json<ScreenRequest>,
) -> Result<Json<ScreenResponse>, ApiError> {
    let include_details = request.include_details;
    let outcome = state.pipeline.screen(request.into()).await?;

    Ok(Json(ScreenResponse::from_outcome(
        &outcome,
        include_details,
        run_id::get(),
        Utc::now(),
    )))
}
