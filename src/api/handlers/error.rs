//! Error responses for every API handler.

use axum::{
    extract::rejection::JsonRejection,
    http::{
        header::{InvalidHeaderValue, CACHE_CONTROL, SET_COOKIE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use super::auth::token::TokenError;
use crate::store::StoreError;

/// One rejected field of a request body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub path: Vec<String>,
    pub message: String,
}

impl FieldError {
    /// `field` may be a dotted path such as `links.0.order`.
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            path: field.split('.').map(str::to_string).collect(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    /// Missing, invalid or expired session, or a wrong password.
    #[error("Unauthorized")]
    Unauthorized { clear_cookie: Option<HeaderValue> },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Not Found")]
    NoRoute,
    #[error("Server misconfigured: missing admin password")]
    Misconfigured,
    #[error("failed to sign session: {0}")]
    Token(#[from] TokenError),
    #[error("invalid header value: {0}")]
    Header(#[from] InvalidHeaderValue),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) | Self::NoRoute => StatusCode::NOT_FOUND,
            Self::Misconfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::Token(_) | Self::Header(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(err) if err.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(details) => ErrorBody {
                error: self.to_string(),
                details: details.clone(),
            },
            Self::Store(err) => {
                error!("Store failure: {err}");
                if err.is_retryable() {
                    ErrorBody::new("Storage unavailable")
                } else {
                    ErrorBody::new("Internal Server Error")
                }
            }
            Self::Token(err) => {
                error!("Failed to issue session: {err}");
                ErrorBody::new("Internal Server Error")
            }
            Self::Header(err) => {
                error!("Failed to build response header: {err}");
                ErrorBody::new("Internal Server Error")
            }
            _ => ErrorBody::new(self.to_string()),
        };

        let mut response = (
            status,
            [(CACHE_CONTROL, HeaderValue::from_static("no-store"))],
            Json(body),
        )
            .into_response();

        if let Self::Unauthorized {
            clear_cookie: Some(cookie),
        } = self
        {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
        response
    }
}
