use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{
    auth::{utils::is_local_host, AuthState},
    no_store, ApiError, ErrorBody,
};

/// Which secrets are configured, never their values.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvReport {
    pub has_password: bool,
    pub has_secret: bool,
}

#[utoipa::path(
    get,
    path = "/api/debug/env",
    responses(
        (status = 200, description = "Configuration presence flags", body = EnvReport),
        (status = 404, description = "Not served to non-local hosts", body = ErrorBody)
    ),
    tag = "debug"
)]
pub async fn debug_env(
    headers: HeaderMap,
    Extension(auth): Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    if !is_local_host(&headers) {
        return Err(ApiError::NoRoute);
    }

    let report = EnvReport {
        has_password: auth.config().has_password(),
        has_secret: auth.config().has_session_secret(),
    };

    Ok((StatusCode::OK, no_store(), Json(report)).into_response())
}
