use axum::{
    extract::{rejection::JsonRejection, Extension},
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
    no_store,
    validate::Validator,
    ApiError, ErrorBody,
};
use crate::{
    model::{normalize, normalize_settings, IconFit, Settings, SettingsPatch},
    store::DocumentStore,
};

const ICON_DATA_MAX: usize = 360_000;

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettings {
    #[serde(default)]
    pub site_title: Option<String>,
    #[serde(default)]
    pub site_subtitle: Option<String>,
    #[serde(default)]
    pub home_tagline: Option<String>,
    /// `data:image/...`, an http(s) URL, or `""` to remove.
    #[serde(default)]
    pub site_icon_data_url: Option<String>,
    #[serde(default)]
    pub favicon_data_url: Option<String>,
    #[serde(default)]
    pub site_icon_fit: Option<IconFit>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettingsEnvelope {
    pub settings: Settings,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettingsResponse {
    pub ok: bool,
    pub settings: Settings,
}

#[utoipa::path(
    get,
    path = "/api/admin/settings",
    responses(
        (status = 200, description = "Current site settings", body = SettingsEnvelope),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn get_settings(
    headers: HeaderMap,
    uri: Uri,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DocumentStore>,
) -> Result<Response, ApiError> {
    authorize(&headers, &uri, &auth)?;

    let settings = normalize(store.load().await?).settings;

    Ok((StatusCode::OK, no_store(), Json(SettingsEnvelope { settings })).into_response())
}

#[utoipa::path(
    put,
    path = "/api/admin/settings",
    request_body = UpdateSettings,
    responses(
        (status = 200, description = "Settings updated", body = SettingsResponse),
        (status = 400, description = "Invalid request body", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn update_settings(
    headers: HeaderMap,
    uri: Uri,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DocumentStore>,
    payload: Result<Json<UpdateSettings>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize(&headers, &uri, &auth)?;
    let Json(body) = payload?;

    let mut validator = Validator::new();
    let patch = SettingsPatch {
        site_title: validator.optional_text("siteTitle", body.site_title.as_deref(), 1, 40),
        site_subtitle: validator.optional_text(
            "siteSubtitle",
            body.site_subtitle.as_deref(),
            1,
            60,
        ),
        home_tagline: validator.optional_text(
            "homeTagline",
            body.home_tagline.as_deref(),
            1,
            120,
        ),
        site_icon_data_url: validator.optional_text(
            "siteIconDataUrl",
            body.site_icon_data_url.as_deref(),
            0,
            ICON_DATA_MAX,
        ),
        favicon_data_url: validator.optional_text(
            "faviconDataUrl",
            body.favicon_data_url.as_deref(),
            0,
            ICON_DATA_MAX,
        ),
        site_icon_fit: body.site_icon_fit,
    };
    validator.non_empty_patch(patch.is_empty());
    validator.finish()?;

    let settings = store
        .update(move |doc| {
            let mut settings = normalize_settings(doc.settings.clone());
            patch.apply(&mut settings);
            let settings = normalize_settings(settings);

            // Checked on the merged result, untouched stored values included.
            let mut validator = Validator::new();
            validator.image_ref("siteIconDataUrl", &settings.site_icon_data_url);
            validator.image_ref("faviconDataUrl", &settings.favicon_data_url);
            validator.finish()?;

            doc.settings = settings.clone();
            Ok::<_, ApiError>(settings)
        })
        .await??;

    info!("Settings updated");

    Ok((StatusCode::OK, no_store(), Json(SettingsResponse { ok: true, settings })).into_response())
}
