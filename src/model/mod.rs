//! The dashboard document: settings plus three nested collections
//! (groups → sections → links).
//!
//! Ordering and referential integrity are never trusted from input; every
//! write goes through [`normalize`] first.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

mod lenient;
pub mod normalize;
pub mod patch;

pub use normalize::{normalize, normalize_settings};
pub use patch::{
    GroupPatch, LinkPatch, LinkPlacement, ReorderPatch, SectionPatch, SectionRef, SettingsPatch,
};

/// Sort key for entities whose stored `order` is missing or not a number.
pub const UNORDERED: i64 = i64::MAX;

pub const DEFAULT_SITE_TITLE: &str = "CloudNav";
pub const DEFAULT_SITE_SUBTITLE: &str = "Personal link dashboard";
pub const DEFAULT_HOME_TAGLINE: &str = "Everything you need, one click away.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IconFit {
    #[default]
    Contain,
    Cover,
}

impl IconFit {
    /// Only `cover` is distinct; every other value means `contain`.
    #[must_use]
    pub fn coerce(value: Option<&str>) -> Self {
        match value {
            Some("cover") => Self::Cover,
            _ => Self::Contain,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub site_title: String,
    pub site_subtitle: String,
    pub home_tagline: String,
    /// URL or `data:image/...` reference, empty when unset.
    pub site_icon_data_url: String,
    pub favicon_data_url: String,
    pub site_icon_fit: IconFit,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site_title: DEFAULT_SITE_TITLE.to_string(),
            site_subtitle: DEFAULT_SITE_SUBTITLE.to_string(),
            home_tagline: DEFAULT_HOME_TAGLINE.to_string(),
            site_icon_data_url: String::new(),
            favicon_data_url: String::new(),
            site_icon_fit: IconFit::Contain,
        }
    }
}

impl Settings {
    /// Read settings from an arbitrary JSON value, falling back to defaults
    /// per field. `siteIcon` and `favicon` are accepted as legacy names.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str))
                .map(str::to_string)
        };
        let defaults = Self::default();

        Self {
            site_title: text(&["siteTitle"]).unwrap_or(defaults.site_title),
            site_subtitle: text(&["siteSubtitle"]).unwrap_or(defaults.site_subtitle),
            home_tagline: text(&["homeTagline"]).unwrap_or(defaults.home_tagline),
            site_icon_data_url: text(&["siteIconDataUrl", "siteIcon"])
                .unwrap_or(defaults.site_icon_data_url),
            favicon_data_url: text(&["faviconDataUrl", "favicon"])
                .unwrap_or(defaults.favicon_data_url),
            site_icon_fit: IconFit::coerce(value.get("siteIconFit").and_then(Value::as_str)),
        }
    }
}

impl<'de> Deserialize<'de> for Settings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default = "lenient::unordered", deserialize_with = "lenient::order")]
    pub order: i64,
    #[serde(default = "lenient::enabled_default", deserialize_with = "lenient::enabled")]
    pub enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub group_id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default = "lenient::unordered", deserialize_with = "lenient::order")]
    pub order: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: String,
    pub group_id: String,
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub section_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub url: String,
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub icon: Option<String>,
    #[serde(default = "lenient::unordered", deserialize_with = "lenient::order")]
    pub order: i64,
}

/// The whole dataset. One instance per deployment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Document {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, deserialize_with = "lenient::list")]
    pub groups: Vec<Group>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub sections: Vec<Section>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub links: Vec<Link>,
}

impl Document {
    /// First-run content.
    #[must_use]
    pub fn seed() -> Self {
        let group_id = "favorites".to_string();
        Self {
            settings: Settings::default(),
            groups: vec![Group {
                id: group_id.clone(),
                name: "Favorites".to_string(),
                order: 0,
                enabled: true,
            }],
            sections: Vec::new(),
            links: vec![
                Link {
                    id: "rust-lang".to_string(),
                    group_id: group_id.clone(),
                    section_id: None,
                    title: "Rust".to_string(),
                    url: "https://www.rust-lang.org".to_string(),
                    description: Some("A language empowering everyone".to_string()),
                    icon: Some("https://www.rust-lang.org/favicon.ico".to_string()),
                    order: 0,
                },
                Link {
                    id: "github".to_string(),
                    group_id,
                    section_id: None,
                    title: "GitHub".to_string(),
                    url: "https://github.com".to_string(),
                    description: None,
                    icon: Some("https://github.com/favicon.ico".to_string()),
                    order: 1,
                },
            ],
        }
    }

    /// Replace `self` with its normalized form.
    pub fn renormalize(&mut self) {
        *self = normalize(std::mem::take(self));
    }

    #[must_use]
    pub fn group(&self, id: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == id)
    }

    #[must_use]
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.id == id)
    }

    #[must_use]
    pub fn link(&self, id: &str) -> Option<&Link> {
        self.links.iter().find(|link| link.id == id)
    }

    /// `Some(section_id)` only when the section exists and belongs to `group_id`.
    #[must_use]
    pub fn valid_section(&self, group_id: &str, section_id: Option<&str>) -> Option<String> {
        let section_id = section_id.map(str::trim).filter(|id| !id.is_empty())?;
        self.sections
            .iter()
            .any(|section| section.id == section_id && section.group_id == group_id)
            .then(|| section_id.to_string())
    }

    /// Order that appends a new group after every existing one.
    #[must_use]
    pub fn next_group_order(&self) -> i64 {
        next_after(self.groups.iter().map(|group| group.order))
    }

    #[must_use]
    pub fn next_section_order(&self, group_id: &str) -> i64 {
        next_after(
            self.sections
                .iter()
                .filter(|section| section.group_id == group_id)
                .map(|section| section.order),
        )
    }

    /// Order that appends a link at the end of the `(group_id, section_id)` bucket.
    #[must_use]
    pub fn next_link_order(&self, group_id: &str, section_id: Option<&str>) -> i64 {
        next_after(
            self.links
                .iter()
                .filter(|link| link.group_id == group_id && link.section_id.as_deref() == section_id)
                .map(|link| link.order),
        )
    }
}

fn next_after(orders: impl Iterator<Item = i64>) -> i64 {
    orders
        .filter(|order| *order != UNORDERED)
        .max()
        .map_or(0, |max| max.saturating_add(1))
}
