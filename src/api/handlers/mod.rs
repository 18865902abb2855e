//! API handlers and the bits they share.
//!
//! Admin mutations all follow the same path: authorize, validate the body
//! into an explicit patch, then run it through [`DocumentStore::update`] so
//! the read-modify-write happens inside the store task.
//!
//! [`DocumentStore::update`]: crate::store::DocumentStore::update

pub mod auth;
pub mod debug;
pub mod error;
pub mod groups;
pub mod health;
pub mod links;
pub mod reorder;
pub mod save;
pub mod sections;
pub mod settings;
pub(crate) mod validate;

use axum::http::{header::CACHE_CONTROL, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub use error::{ApiError, ErrorBody, FieldError};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    #[must_use]
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn no_store() -> [(HeaderName, HeaderValue); 1] {
    [(CACHE_CONTROL, HeaderValue::from_static("no-store"))]
}

/// Fallback for unknown `/api/*` paths.
pub async fn api_not_found() -> ApiError {
    ApiError::NoRoute
}
