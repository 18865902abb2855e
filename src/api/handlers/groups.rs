use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use super::{
    auth::{authorize, AuthState},
    new_id, no_store,
    validate::Validator,
    Ack, ApiError, ErrorBody,
};
use crate::{
    model::{Group, GroupPatch},
    store::DocumentStore,
};

const NAME_MAX: usize = 64;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGroup {
    pub name: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateGroup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GroupResponse {
    pub ok: bool,
    pub group: Group,
}

#[utoipa::path(
    post,
    path = "/api/admin/groups",
    request_body = CreateGroup,
    responses(
        (status = 200, description = "Group appended after every existing group", body = GroupResponse),
        (status = 400, description = "Invalid request body", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn create_group(
    headers: HeaderMap,
    uri: Uri,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DocumentStore>,
    payload: Result<Json<CreateGroup>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize(&headers, &uri, &auth)?;
    let Json(body) = payload?;

    let mut validator = Validator::new();
    let name = validator.text("name", &body.name, 1, NAME_MAX);
    validator.finish()?;

    let id = new_id();
    let group = store
        .update(move |doc| {
            let order = doc.next_group_order();
            doc.groups.push(Group {
                id: id.clone(),
                name,
                order,
                enabled: true,
            });
            doc.renormalize();
            doc.group(&id).cloned().ok_or(ApiError::NotFound("Group"))
        })
        .await??;

    info!(group.id = %group.id, "Group created");

    Ok((StatusCode::OK, no_store(), Json(GroupResponse { ok: true, group })).into_response())
}

#[utoipa::path(
    put,
    path = "/api/admin/groups/{id}",
    params(("id" = String, Path, description = "Group id")),
    request_body = UpdateGroup,
    responses(
        (status = 200, description = "Group updated", body = GroupResponse),
        (status = 400, description = "Invalid request body", body = ErrorBody),
        (status = 404, description = "Group not found", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn update_group(
    headers: HeaderMap,
    uri: Uri,
    Path(id): Path<String>,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DocumentStore>,
    payload: Result<Json<UpdateGroup>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize(&headers, &uri, &auth)?;
    let Json(body) = payload?;

    let mut validator = Validator::new();
    let patch = GroupPatch {
        name: validator.optional_text("name", body.name.as_deref(), 1, NAME_MAX),
        enabled: body.enabled,
    };
    validator.non_empty_patch(patch.is_empty());
    validator.finish()?;

    let group = store
        .update(move |doc| {
            let group = doc
                .groups
                .iter_mut()
                .find(|group| group.id == id)
                .ok_or(ApiError::NotFound("Group"))?;
            patch.apply(group);
            doc.renormalize();
            doc.group(&id).cloned().ok_or(ApiError::NotFound("Group"))
        })
        .await??;

    Ok((StatusCode::OK, no_store(), Json(GroupResponse { ok: true, group })).into_response())
}

/// Removes the group together with its sections and links.
#[utoipa::path(
    delete,
    path = "/api/admin/groups/{id}",
    params(("id" = String, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group, its sections and its links removed", body = Ack),
        (status = 404, description = "Group not found", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn delete_group(
    headers: HeaderMap,
    uri: Uri,
    Path(id): Path<String>,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DocumentStore>,
) -> Result<Response, ApiError> {
    authorize(&headers, &uri, &auth)?;

    let removed = id.clone();
    store
        .update(move |doc| {
            if doc.group(&id).is_none() {
                return Err(ApiError::NotFound("Group"));
            }
            doc.groups.retain(|group| group.id != id);
            doc.sections.retain(|section| section.group_id != id);
            doc.links.retain(|link| link.group_id != id);
            Ok(())
        })
        .await??;

    info!(group.id = %removed, "Group deleted");

    Ok((StatusCode::OK, no_store(), Json(Ack::ok())).into_response())
}
