use axum::{Json, extract::State};
use tracing::info;

use screener_core::api::LearningPlanRequest;
use screener_core::learning::{LearningOptions, LearningPlan, build_learning_plan, learning_targets};

use crate::SharedState;
use crate::auth::ApiKeyAuth;
use crate::error::ApiError;

/// `missing_skills` が空で `screening` があれば、その採点の不足スキルを対象にする
pub async fn learning_plan(
    State(state): State<SharedState>,
    _auth: ApiKeyAuth,
    Json(request): Json<LearningPlanRequest>,
) -> Result<Json<LearningPlan>, ApiError> {
    if request.max_skills == Some(0) {
        return Err(ApiError::Validation("max_skills must be positive".into()));
    }

    let targets = if !request.missing_skills.is_empty() {
        request.missing_skills
    } else if let Some(screening) = request.screening {
        let outcome = state.pipeline.screen(screening.into()).await?;
        learning_targets(&outcome.result.missing_skills, &outcome.missing_preferred)
    } else {
        return Err(ApiError::Validation(
            "either missing_skills or screening is required".into(),
        ));
    };
    if targets.iter().any(|t| t.skill_name.trim().is_empty()) {
        return Err(ApiError::Validation("skill_name must not be empty".into()));
    }

    let defaults = LearningOptions::default();
    let options = LearningOptions {
        max_skills: request.max_skills.unwrap_or(defaults.max_skills),
        difficulty: request.difficulty.or(defaults.difficulty),
        ..defaults
    };
    let plan = build_learning_plan(&targets, &state.learning, state.pipeline.taxonomy(), options);
    info!(
        plan_id = %plan.plan_id,
        skills = plan.total_skills_to_learn,
        estimated_weeks = plan.estimated_weeks,
        "learning plan built"
    );

    Ok(Json(plan))
}
