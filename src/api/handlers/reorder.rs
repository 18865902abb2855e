use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

use super::{
    auth::{authorize, AuthState},
    no_store,
    validate::Validator,
    Ack, ApiError, ErrorBody,
};
use crate::{
    model::{LinkPlacement, ReorderPatch, SectionRef},
    store::DocumentStore,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderEntry {
    pub id: String,
    pub order: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkOrderEntry {
    pub id: String,
    pub order: i64,
    #[serde(default)]
    pub group_id: Option<String>,
    /// Absent keeps the current section, `null` or `""` clears it.
    ///
    /// This matches the admin dashboard's reorder endpoint, which only
    /// touches `sectionId` when the key is sent. The standalone worker route
    /// clears the section when the key is missing; clients relying on that
    /// must send `null` explicitly.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub section_id: SectionRef,
}

/// Sparse: only the listed entities move.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReorderRequest {
    #[serde(default)]
    pub groups: Vec<OrderEntry>,
    #[serde(default)]
    pub sections: Vec<OrderEntry>,
    #[serde(default)]
    pub links: Vec<LinkOrderEntry>,
}

impl ReorderRequest {
    /// Later entries for the same id win.
    fn into_patch(self, validator: &mut Validator) -> ReorderPatch {
        let mut patch = ReorderPatch::default();

        for (index, entry) in self.groups.into_iter().enumerate() {
            let id = validator.id(&format!("groups.{index}.id"), &entry.id);
            let order = validator.order(&format!("groups.{index}.order"), entry.order);
            patch.groups.insert(id, order);
        }
        for (index, entry) in self.sections.into_iter().enumerate() {
            let id = validator.id(&format!("sections.{index}.id"), &entry.id);
            let order = validator.order(&format!("sections.{index}.order"), entry.order);
            patch.sections.insert(id, order);
        }
        for (index, entry) in self.links.into_iter().enumerate() {
            let id = validator.id(&format!("links.{index}.id"), &entry.id);
            let order = validator.order(&format!("links.{index}.order"), entry.order);
            let group_id = entry
                .group_id
                .map(|group_id| validator.id(&format!("links.{index}.groupId"), &group_id));
            patch.links.insert(
                id,
                LinkPlacement {
                    order,
                    group_id,
                    section: entry.section_id,
                },
            );
        }

        patch
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/reorder",
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Orders applied and renumbered", body = Ack),
        (status = 400, description = "Invalid request body", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn reorder(
    headers: HeaderMap,
    uri: Uri,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DocumentStore>,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize(&headers, &uri, &auth)?;
    let Json(body) = payload?;

    let mut validator = Validator::new();
    let patch = body.into_patch(&mut validator);
    validator.finish()?;

    debug!(
        groups = patch.groups.len(),
        sections = patch.sections.len(),
        links = patch.links.len(),
        "Applying reorder"
    );

    store
        .update(move |doc| {
            patch.apply(doc);
            Ok::<_, ApiError>(())
        })
        .await??;

    Ok((StatusCode::OK, no_store(), Json(Ack::ok())).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_maps_to_sparse_patch() {
        let request: ReorderRequest = serde_json::from_value(json!({
            "groups": [{"id": "a", "order": 3}, {"id": "a", "order": 1}],
            "links": [
                {"id": "l1", "order": 0},
                {"id": "l2", "order": 2, "groupId": "b", "sectionId": null}
            ]
        }))
        .unwrap();

        let mut validator = Validator::new();
        let patch = request.into_patch(&mut validator);
        assert!(validator.finish().is_ok());

        assert_eq!(patch.groups.get("a"), Some(&1));
        assert!(patch.sections.is_empty());
        assert_eq!(patch.links["l1"].section, SectionRef::Keep);
        assert_eq!(patch.links["l2"].section, SectionRef::Clear);
        assert_eq!(patch.links["l2"].group_id.as_deref(), Some("b"));
    }

    #[test]
    fn negative_orders_and_blank_ids_are_reported_with_paths() {
        let request: ReorderRequest = serde_json::from_value(json!({
            "sections": [{"id": "", "order": -1}]
        }))
        .unwrap();
        let mut validator = Validator::new();
        request.into_patch(&mut validator);
        match validator.finish() {
            Err(ApiError::Validation(errors)) => {
                let paths: Vec<String> = errors.iter().map(|e| e.path.join(".")).collect();
                assert_eq!(paths, vec!["sections.0.id", "sections.0.order"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
