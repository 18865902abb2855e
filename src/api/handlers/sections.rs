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
    model::{Section, SectionPatch},
    store::DocumentStore,
};

const NAME_MAX: usize = 60;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSection {
    pub group_id: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SectionResponse {
    pub ok: bool,
    pub section: Section,
}

#[utoipa::path(
    post,
    path = "/api/admin/sections",
    request_body = CreateSection,
    responses(
        (status = 200, description = "Section appended to its group", body = SectionResponse),
        (status = 400, description = "Invalid request body", body = ErrorBody),
        (status = 404, description = "Group not found", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn create_section(
    headers: HeaderMap,
    uri: Uri,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DocumentStore>,
    payload: Result<Json<CreateSection>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize(&headers, &uri, &auth)?;
    let Json(body) = payload?;

    let mut validator = Validator::new();
    let group_id = validator.id("groupId", &body.group_id);
    let name = validator.text("name", &body.name, 1, NAME_MAX);
    validator.finish()?;

    let id = new_id();
    let section = store
        .update(move |doc| {
            if doc.group(&group_id).is_none() {
                return Err(ApiError::NotFound("Group"));
            }
            let order = doc.next_section_order(&group_id);
            doc.sections.push(Section {
                id: id.clone(),
                group_id,
                name,
                order,
            });
            doc.renormalize();
            doc.section(&id).cloned().ok_or(ApiError::NotFound("Section"))
        })
        .await??;

    info!(section.id = %section.id, group.id = %section.group_id, "Section created");

    Ok((StatusCode::OK, no_store(), Json(SectionResponse { ok: true, section })).into_response())
}

#[utoipa::path(
    put,
    path = "/api/admin/sections/{id}",
    params(("id" = String, Path, description = "Section id")),
    request_body = UpdateSection,
    responses(
        (status = 200, description = "Section updated", body = SectionResponse),
        (status = 400, description = "Invalid request body", body = ErrorBody),
        (status = 404, description = "Section not found", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn update_section(
    headers: HeaderMap,
    uri: Uri,
    Path(id): Path<String>,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DocumentStore>,
    payload: Result<Json<UpdateSection>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize(&headers, &uri, &auth)?;
    let Json(body) = payload?;

    let mut validator = Validator::new();
    let patch = SectionPatch {
        name: validator.optional_text("name", body.name.as_deref(), 1, NAME_MAX),
        order: body.order.map(|order| validator.order("order", order)),
    };
    validator.non_empty_patch(patch.is_empty());
    validator.finish()?;

    let section = store
        .update(move |doc| {
            let section = doc
                .sections
                .iter_mut()
                .find(|section| section.id == id)
                .ok_or(ApiError::NotFound("Section"))?;
            patch.apply(section);
            doc.renormalize();
            doc.section(&id).cloned().ok_or(ApiError::NotFound("Section"))
        })
        .await??;

    Ok((StatusCode::OK, no_store(), Json(SectionResponse { ok: true, section })).into_response())
}

/// Removes the section; its links stay in the group, unsectioned.
#[utoipa::path(
    delete,
    path = "/api/admin/sections/{id}",
    params(("id" = String, Path, description = "Section id")),
    responses(
        (status = 200, description = "Section removed", body = Ack),
        (status = 404, description = "Section not found", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn delete_section(
    headers: HeaderMap,
    uri: Uri,
    Path(id): Path<String>,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DocumentStore>,
) -> Result<Response, ApiError> {
    authorize(&headers, &uri, &auth)?;

    store
        .update(move |doc| {
            if doc.section(&id).is_none() {
                return Err(ApiError::NotFound("Section"));
            }
            doc.sections.retain(|section| section.id != id);
            for link in &mut doc.links {
                if link.section_id.as_deref() == Some(id.as_str()) {
                    link.section_id = None;
                }
            }
            Ok(())
        })
        .await??;

    Ok((StatusCode::OK, no_store(), Json(Ack::ok())).into_response())
}
