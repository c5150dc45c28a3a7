use axum::async_trait;
use axum::extract::FromRef;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub api_key: String,
}

/// `X-API-Key` が一致したリクエスト
#[derive(Debug, Clone, Copy)]
pub struct ApiKeyAuth;

#[async_trait]
impl<S> FromRequestParts<S> for ApiKeyAuth
where
    AuthConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AuthConfig::from_ref(state);
        authorize_api_key(parts, &config)
    }
}

fn authorize_api_key(parts: &Parts, config: &AuthConfig) -> Result<ApiKeyAuth, ApiError> {
    let provided = parts
        .headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing X-API-Key header".into()))?;

    if provided != config.api_key {
        return Err(ApiError::Unauthorized("invalid API key".into()));
    }

    Ok(ApiKeyAuth)
}
