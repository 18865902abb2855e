//! Bulk replacement kept for older admin clients.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::{
    auth::{authorize, AuthState},
    no_store, Ack, ApiError, ErrorBody,
};
use crate::{model::Document, store::DocumentStore};

/// Replace `groups` and `links` wholesale; `sections` and `settings` only
/// when the body carries them. The result is normalized like any other write.
#[utoipa::path(
    post,
    path = "/api/admin/save",
    request_body(content = Document, description = "Full or partial document; `groups` and `links` are required"),
    responses(
        (status = 200, description = "Document replaced", body = Ack),
        (status = 400, description = "Body is not a document", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn save(
    headers: HeaderMap,
    uri: Uri,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DocumentStore>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize(&headers, &uri, &auth)?;
    let Json(body) = payload?;

    let has_lists = body.get("groups").is_some_and(Value::is_array)
        && body.get("links").is_some_and(Value::is_array);
    if !has_lists {
        warn!("Rejected legacy save without groups/links arrays");
        return Err(ApiError::BadRequest("Invalid data".to_string()));
    }
    let has_sections = body.get("sections").is_some_and(Value::is_array);
    let has_settings = body.get("settings").is_some_and(|value| !value.is_null());

    let incoming: Document = serde_json::from_value(body)
        .map_err(|err| ApiError::BadRequest(format!("Invalid data: {err}")))?;

    store
        .update(move |doc| {
            doc.groups = incoming.groups;
            doc.links = incoming.links;
            if has_sections {
                doc.sections = incoming.sections;
            }
            if has_settings {
                doc.settings = incoming.settings;
            }
            Ok::<_, ApiError>(())
        })
        .await??;

    info!("Document replaced through legacy save");

    Ok((StatusCode::OK, no_store(), Json(Ack::ok())).into_response())
}
