use axum::{Json, extract::State};

use screener_core::api::{SkillsRequest, SkillsResponse};

use crate::SharedState;
use crate::auth::ApiKeyAuth;
use crate::error::ApiError;

/// テキスト1件からタクソノミーのスキルを抽出する
pub async fn extract_skills(
    State(state): State<SharedState>,
    _auth: ApiKeyAuth,
    Json(request): Json<SkillsRequest>,
) -> Result<Json<SkillsResponse>, ApiError> {
    state.pipeline.validate_text("text", &request.text)?;
    let skills = state.pipeline.extract_skills(&request.text);
    Ok(Json(SkillsResponse::from(&skills)))
}
