use super::handlers::{
    auth, debug, groups, health, links, reorder, save, sections, settings,
};
use utoipa::{
    openapi::{InfoBuilder, License, Tag},
    OpenApi,
};

#[derive(OpenApi)]
#[openapi(paths(
    health::health,
    links::list_links,
    auth::session::me,
    auth::session::login,
    auth::session::logout,
    debug::debug_env,
    groups::create_group,
    groups::update_group,
    groups::delete_group,
    sections::create_section,
    sections::update_section,
    sections::delete_section,
    links::create_link,
    links::update_link,
    links::delete_link,
    reorder::reorder,
    settings::get_settings,
    settings::update_settings,
    save::save,
))]
struct ApiDoc;

/// The `OpenAPI` document for every served `/api` route and `/health`.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info = cargo_info();
    doc.tags = Some(vec![
        tag("links", "Public dashboard content"),
        tag("auth", "Admin session cookie"),
        tag("admin", "Dashboard editing, session required"),
        tag("health", "Liveness of the service and its store"),
        tag("debug", "Local development helpers"),
    ]);
    doc
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_info() -> utoipa::openapi::Info {
    // Cargo.toml metadata rather than the utoipa defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    info.license = optional_str(env!("CARGO_PKG_LICENSE")).map(|identifier| {
        let mut license = License::new(identifier);
        license.identifier = Some(identifier.to_string());
        license
    });
    info
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
