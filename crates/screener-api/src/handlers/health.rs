use axum::{Json, extract::State};
use serde_json::json;

use crate::SharedState;
use crate::error::ApiError;

pub async fn livez() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn readyz(State(state): State<SharedState>) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.readiness.load(std::sync::atomic::Ordering::SeqCst) {
        return Err(ApiError::ServiceUnavailable("shutting_down".into()));
    }

    let pipeline = &state.pipeline;
    let embedder = pipeline.embedder().info();

    Ok(Json(json!({
        "status": "ok",
        "application": env!("CARGO_PKG_NAME"),
        "run_id": screener_core::run_id::get(),
        "taxonomy_version": pipeline.taxonomy().version(),
        "taxonomy_skills": pipeline.taxonomy().len(),
        "learning_catalog_skills": state.learning.len(),
        "embedder": embedder,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn readyz_rejects_when_readiness_disabled() {
        let state = crate::test_state("test-key");
        state.readiness.store(false, Ordering::SeqCst);

        let result = readyz(State(state)).await;

        match result {
            Err(ApiError::ServiceUnavailable(code)) => {
                assert!(code.contains("shutting_down"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn readyz_reports_taxonomy_and_embedder() {
        let Json(body) = readyz(State(crate::test_state("test-key"))).await.unwrap();

        assert_eq!(body["status"], "ok");
        assert!(body["taxonomy_version"].as_str().unwrap().starts_with("2024.06+"));
        assert_eq!(body["embedder"]["name"], "hash");
        assert_eq!(body["learning_catalog_skills"], 0);
    }
}
