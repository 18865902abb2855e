//! Cookie sessions: login, logout, `me` and the admin guard.

use axum::{
    body::Bytes,
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::{
    guard::LoginGuard,
    state::{AuthConfig, AuthState},
    utils::{extract_client_ip, is_secure_request},
};
use crate::api::handlers::{no_store, Ack, ApiError, ErrorBody};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionStatus {
    pub authed: bool,
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session cookie issued", body = Ack),
        (status = 400, description = "Malformed body or blank password", body = ErrorBody),
        (status = 401, description = "Wrong password", body = ErrorBody),
        (status = 503, description = "No admin password configured", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    uri: Uri,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(guard): Extension<LoginGuard>,
    body: Bytes,
) -> Result<Response, ApiError> {
    if !auth.is_configured() {
        return Err(ApiError::Misconfigured);
    }

    let ip = extract_client_ip(&headers);

    // Penalty applies before the body is even read.
    let penalty = guard.penalty_for(&ip).await?;
    if !penalty.is_zero() {
        debug!(%ip, penalty_ms = penalty.as_millis(), "delaying login attempt");
        tokio::time::sleep(penalty).await;
    }

    let request: LoginRequest = serde_json::from_slice(&body)
        .map_err(|err| ApiError::BadRequest(format!("Invalid JSON body: {err}")))?;
    let provided = request.password.unwrap_or_default();
    if provided.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing password".to_string()));
    }

    let secure = is_secure_request(&headers, &uri);

    if !auth.check_password(&provided) {
        let fails = guard.record_failure(&ip).await?;
        warn!(%ip, fails, "Rejected admin login");
        return Err(unauthorized(auth.config(), secure));
    }

    guard.clear(&ip).await?;

    let now = chrono::Utc::now().timestamp();
    let Some((token, claims)) = auth.issue(now)? else {
        return Err(ApiError::Misconfigured);
    };
    let cookie = session_cookie(auth.config(), &token, claims.remaining(now), secure)?;

    info!(%ip, "Admin session issued");

    let mut response = (StatusCode::OK, no_store(), Json(Ack::ok())).into_response();
    response.headers_mut().append(SET_COOKIE, cookie);
    Ok(response)
}

#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = Ack)
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    uri: Uri,
    Extension(auth): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let mut response = (StatusCode::OK, no_store(), Json(Ack::ok())).into_response();
    // Always clear the cookie, even when no session was presented.
    if let Ok(cookie) = clear_session_cookie(auth.config(), is_secure_request(&headers, &uri)) {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Whether the caller holds a valid admin session", body = SessionStatus)
    ),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    uri: Uri,
    Extension(auth): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let token = extract_session_token(&headers, auth.config().cookie_name());

    let (authed, clear) = match token {
        None => (false, false),
        Some(_) if !auth.is_configured() => (false, false),
        Some(token) => {
            let valid = auth.verify(&token).is_some();
            (valid, !valid)
        }
    };

    let mut response =
        (StatusCode::OK, no_store(), Json(SessionStatus { authed })).into_response();
    if clear {
        if let Ok(cookie) = clear_session_cookie(auth.config(), is_secure_request(&headers, &uri)) {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
    }
    response
}

/// Gate for admin routes.
///
/// # Errors
/// [`ApiError::Misconfigured`] when no password is set, otherwise
/// [`ApiError::Unauthorized`] carrying a cookie-clearing header for any
/// missing, invalid or expired session.
pub(crate) fn authorize(headers: &HeaderMap, uri: &Uri, auth: &AuthState) -> Result<(), ApiError> {
    if !auth.is_configured() {
        return Err(ApiError::Misconfigured);
    }
    let valid = extract_session_token(headers, auth.config().cookie_name())
        .is_some_and(|token| auth.verify(&token).is_some());
    if valid {
        Ok(())
    } else {
        Err(unauthorized(auth.config(), is_secure_request(headers, uri)))
    }
}

fn unauthorized(config: &AuthConfig, secure: bool) -> ApiError {
    ApiError::Unauthorized {
        clear_cookie: clear_session_cookie(config, secure).ok(),
    }
}

/// `HttpOnly` session cookie living exactly as long as the token.
pub(super) fn session_cookie(
    config: &AuthConfig,
    token: &str,
    max_age: i64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let name = config.cookie_name();
    let mut cookie = format!("{name}={token}; Path=/; SameSite=Lax; HttpOnly; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    session_cookie(config, "", 0, secure)
}

fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
