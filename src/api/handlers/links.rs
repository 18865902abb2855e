//! The public dashboard read and link administration.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::{header::CACHE_CONTROL, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;
use utoipa::ToSchema;

use super::{
    auth::{authorize, AuthState},
    new_id, no_store,
    validate::{normalize_http_url, parse_http_url, Validator},
    Ack, ApiError, ErrorBody,
};
use crate::{
    model::{normalize, Document, Link, LinkPatch, SectionRef},
    store::DocumentStore,
};

const TITLE_MAX: usize = 80;
const DESCRIPTION_MAX: usize = 200;

const PUBLIC_CACHE: &str = "public, max-age=60, s-maxage=300, stale-while-revalidate=86400";
const FAVICON_SERVICE: &str = "https://www.google.com/s2/favicons";

/// Where derived link icons point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IconPolicy {
    /// `<origin>/favicon.ico` of the link itself.
    #[default]
    Origin,
    /// A third-party favicon service keyed by host name.
    Service,
}

impl IconPolicy {
    #[must_use]
    pub fn from_flag(use_service: bool) -> Self {
        if use_service {
            Self::Service
        } else {
            Self::Origin
        }
    }

    /// Icon URL derived from a site URL; `None` when the site URL is unusable.
    #[must_use]
    pub fn icon_for(self, site_url: &str) -> Option<String> {
        let site = parse_http_url(&normalize_http_url(site_url))?;
        match self {
            Self::Origin => Some(format!("{}/favicon.ico", site.origin().ascii_serialization())),
            Self::Service => {
                let host = site.host_str()?;
                Url::parse_with_params(FAVICON_SERVICE, &[("domain", host), ("sz", "64")])
                    .ok()
                    .map(String::from)
            }
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLink {
    pub group_id: String,
    #[serde(default)]
    pub section_id: Option<String>,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Blank or absent derives the icon from `url`.
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLink {
    #[serde(default)]
    pub group_id: Option<String>,
    /// Absent keeps the current section, `null` or `""` clears it.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub section_id: SectionRef,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// `""` clears the description.
    #[serde(default)]
    pub description: Option<String>,
    /// `""` re-derives the icon from the link URL.
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LinkResponse {
    pub ok: bool,
    pub link: Link,
}

#[utoipa::path(
    get,
    path = "/api/links",
    responses(
        (status = 200, description = "The normalized dashboard document", body = Document),
        (status = 503, description = "Store unavailable", body = ErrorBody)
    ),
    tag = "links"
)]
pub async fn list_links(Extension(store): Extension<DocumentStore>) -> Result<Response, ApiError> {
    let doc = normalize(store.load().await?);

    debug!(
        groups = doc.groups.len(),
        sections = doc.sections.len(),
        links = doc.links.len(),
        "Serving dashboard"
    );

    Ok((
        [(CACHE_CONTROL, HeaderValue::from_static(PUBLIC_CACHE))],
        Json(doc),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/admin/links",
    request_body = CreateLink,
    responses(
        (status = 200, description = "Link appended to its bucket", body = LinkResponse),
        (status = 400, description = "Invalid request body", body = ErrorBody),
        (status = 404, description = "Group not found", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn create_link(
    headers: HeaderMap,
    uri: Uri,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DocumentStore>,
    Extension(policy): Extension<IconPolicy>,
    payload: Result<Json<CreateLink>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize(&headers, &uri, &auth)?;
    let Json(body) = payload?;

    let mut validator = Validator::new();
    let group_id = validator.id("groupId", &body.group_id);
    let section_id = body
        .section_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    let title = validator.text("title", &body.title, 1, TITLE_MAX);
    let url = validator.http_url("url", &body.url);
    let description = validator
        .optional_text("description", body.description.as_deref(), 0, DESCRIPTION_MAX)
        .filter(|description| !description.is_empty());
    let icon = body
        .icon
        .as_deref()
        .map(|icon| validator.icon_url("icon", icon))
        .filter(|icon| !icon.is_empty());
    validator.finish()?;

    let icon = icon.or_else(|| policy.icon_for(&url));

    let id = new_id();
    let link = store
        .update(move |doc| {
            if doc.group(&group_id).is_none() {
                return Err(ApiError::NotFound("Group"));
            }
            // An unknown or foreign section is dropped, not rejected.
            let section_id = doc.valid_section(&group_id, section_id.as_deref());
            let order = doc.next_link_order(&group_id, section_id.as_deref());
            doc.links.push(Link {
                id: id.clone(),
                group_id,
                section_id,
                title,
                url,
                description,
                icon,
                order,
            });
            doc.renormalize();
            doc.link(&id).cloned().ok_or(ApiError::NotFound("Link"))
        })
        .await??;

    info!(link.id = %link.id, group.id = %link.group_id, "Link created");

    Ok((StatusCode::OK, no_store(), Json(LinkResponse { ok: true, link })).into_response())
}

#[utoipa::path(
    put,
    path = "/api/admin/links/{id}",
    params(("id" = String, Path, description = "Link id")),
    request_body = UpdateLink,
    responses(
        (status = 200, description = "Link updated", body = LinkResponse),
        (status = 400, description = "Invalid request body", body = ErrorBody),
        (status = 404, description = "Link or target group not found", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn update_link(
    headers: HeaderMap,
    uri: Uri,
    Path(id): Path<String>,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DocumentStore>,
    Extension(policy): Extension<IconPolicy>,
    payload: Result<Json<UpdateLink>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize(&headers, &uri, &auth)?;
    let Json(body) = payload?;

    let mut validator = Validator::new();
    let patch = LinkPatch {
        group_id: body
            .group_id
            .as_deref()
            .map(|group_id| validator.id("groupId", group_id)),
        section: body.section_id,
        title: validator.optional_text("title", body.title.as_deref(), 1, TITLE_MAX),
        url: body.url.as_deref().map(|url| validator.http_url("url", url)),
        description: validator.optional_text(
            "description",
            body.description.as_deref(),
            0,
            DESCRIPTION_MAX,
        ),
        icon: body
            .icon
            .as_deref()
            .map(|icon| validator.icon_url("icon", icon)),
    };
    validator.non_empty_patch(patch.is_empty());
    validator.finish()?;

    let link = store
        .update(move |doc| apply_link_patch(doc, &id, patch, policy))
        .await??;

    Ok((StatusCode::OK, no_store(), Json(LinkResponse { ok: true, link })).into_response())
}

/// Apply a validated patch to link `id` and return it as normalized.
fn apply_link_patch(
    doc: &mut Document,
    id: &str,
    patch: LinkPatch,
    policy: IconPolicy,
) -> Result<Link, ApiError> {
    let index = doc
        .links
        .iter()
        .position(|link| link.id == id)
        .ok_or(ApiError::NotFound("Link"))?;
    let current = doc.links[index].clone();

    let group_id = patch.group_id.unwrap_or_else(|| current.group_id.clone());
    if doc.group(&group_id).is_none() {
        return Err(ApiError::NotFound("Group"));
    }

    let requested = patch.section.resolve(current.section_id.as_deref());
    let section_id = doc.valid_section(&group_id, requested.as_deref());

    let url = patch.url.unwrap_or_else(|| current.url.clone());
    let icon = match patch.icon {
        None => current.icon.clone(),
        Some(icon) if icon.is_empty() => policy.icon_for(&url),
        Some(icon) => Some(icon),
    };
    let description = match patch.description {
        None => current.description.clone(),
        Some(description) if description.is_empty() => None,
        Some(description) => Some(description),
    };

    // A link that changes bucket goes to the end of the new one.
    let moved = group_id != current.group_id || section_id != current.section_id;
    let order = if moved {
        doc.next_link_order(&group_id, section_id.as_deref())
    } else {
        current.order
    };

    doc.links[index] = Link {
        id: current.id,
        group_id,
        section_id,
        title: patch.title.unwrap_or(current.title),
        url,
        description,
        icon,
        order,
    };
    doc.renormalize();
    doc.link(id).cloned().ok_or(ApiError::NotFound("Link"))
}

#[utoipa::path(
    delete,
    path = "/api/admin/links/{id}",
    params(("id" = String, Path, description = "Link id")),
    responses(
        (status = 200, description = "Link removed", body = Ack),
        (status = 404, description = "Link not found", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn delete_link(
    headers: HeaderMap,
    uri: Uri,
    Path(id): Path<String>,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DocumentStore>,
) -> Result<Response, ApiError> {
    authorize(&headers, &uri, &auth)?;

    store
        .update(move |doc| {
            let before = doc.links.len();
            doc.links.retain(|link| link.id != id);
            if doc.links.len() == before {
                return Err(ApiError::NotFound("Link"));
            }
            Ok(())
        })
        .await??;

    Ok((StatusCode::OK, no_store(), Json(Ack::ok())).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Section;

    fn doc_with_sections() -> Document {
        let mut doc = Document::seed();
        doc.groups.push(crate::model::Group {
            id: "work".to_string(),
            name: "Work".to_string(),
            order: 1,
            enabled: true,
        });
        doc.sections.push(Section {
            id: "tools".to_string(),
            group_id: "favorites".to_string(),
            name: "Tools".to_string(),
            order: 0,
        });
        doc.links[1].section_id = Some("tools".to_string());
        doc.links[1].order = 0;
        doc
    }

    #[test]
    fn icon_policies() {
        assert_eq!(
            IconPolicy::Origin.icon_for("example.com/some/page?q=1").as_deref(),
            Some("https://example.com/favicon.ico")
        );
        assert_eq!(
            IconPolicy::Origin.icon_for("http://localhost:8080/x").as_deref(),
            Some("http://localhost:8080/favicon.ico")
        );
        assert_eq!(
            IconPolicy::Service.icon_for("https://docs.rs/serde").as_deref(),
            Some("https://www.google.com/s2/favicons?domain=docs.rs&sz=64")
        );
        assert_eq!(IconPolicy::Origin.icon_for("ftp://files.dev"), None);
        assert_eq!(IconPolicy::from_flag(true), IconPolicy::Service);
    }

    #[test]
    fn absent_section_is_kept_and_null_clears() {
        let mut doc = doc_with_sections();
        let kept = apply_link_patch(
            &mut doc,
            "github",
            LinkPatch {
                title: Some("GH".to_string()),
                ..LinkPatch::default()
            },
            IconPolicy::Origin,
        )
        .unwrap();
        assert_eq!(kept.section_id.as_deref(), Some("tools"));
        assert_eq!(kept.title, "GH");

        let cleared = apply_link_patch(
            &mut doc,
            "github",
            LinkPatch {
                section: SectionRef::Clear,
                ..LinkPatch::default()
            },
            IconPolicy::Origin,
        )
        .unwrap();
        assert_eq!(cleared.section_id, None);
        // Appended after rust-lang in the unsectioned bucket.
        assert_eq!(cleared.order, 1);
    }

    #[test]
    fn moving_group_drops_foreign_section_and_appends() {
        let mut doc = doc_with_sections();
        let moved = apply_link_patch(
            &mut doc,
            "github",
            LinkPatch {
                group_id: Some("work".to_string()),
                ..LinkPatch::default()
            },
            IconPolicy::Origin,
        )
        .unwrap();
        assert_eq!(moved.group_id, "work");
        assert_eq!(moved.section_id, None);
        assert_eq!(moved.order, 0);
    }

    #[test]
    fn blank_icon_is_rederived_from_new_url() {
        let mut doc = doc_with_sections();
        let link = apply_link_patch(
            &mut doc,
            "rust-lang",
            LinkPatch {
                url: Some("https://crates.io/search".to_string()),
                icon: Some(String::new()),
                description: Some(String::new()),
                ..LinkPatch::default()
            },
            IconPolicy::Origin,
        )
        .unwrap();
        assert_eq!(link.icon.as_deref(), Some("https://crates.io/favicon.ico"));
        assert_eq!(link.description, None);
    }

    #[test]
    fn unknown_link_or_group_is_not_found() {
        let mut doc = doc_with_sections();
        assert!(matches!(
            apply_link_patch(&mut doc, "nope", LinkPatch::default(), IconPolicy::Origin),
            Err(ApiError::NotFound("Link"))
        ));
        assert!(matches!(
            apply_link_patch(
                &mut doc,
                "github",
                LinkPatch {
                    group_id: Some("ghost".to_string()),
                    ..LinkPatch::default()
                },
                IconPolicy::Origin
            ),
            Err(ApiError::NotFound("Group"))
        ));
    }
}
