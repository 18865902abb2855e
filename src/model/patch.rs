//! Explicit per-entity patches.
//!
//! Every field is optional and applied only when present; there is no
//! key-presence merging of loose JSON objects.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use super::{Document, Group, IconFit, Section, Settings};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub enabled: Option<bool>,
}

impl GroupPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.enabled.is_none()
    }

    pub fn apply(self, group: &mut Group) {
        if let Some(name) = self.name {
            group.name = name;
        }
        if let Some(enabled) = self.enabled {
            group.enabled = enabled;
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SectionPatch {
    pub name: Option<String>,
    pub order: Option<i64>,
}

impl SectionPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.order.is_none()
    }

    pub fn apply(self, section: &mut Section) {
        if let Some(name) = self.name {
            section.name = name;
        }
        if let Some(order) = self.order {
            section.order = order;
        }
    }
}

/// What a patch does with a link's `sectionId`.
///
/// Absent in the request keeps the current value, `null` or `""` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SectionRef {
    #[default]
    Keep,
    Clear,
    Set(String),
}

impl SectionRef {
    /// The requested section id, before validation against the target group.
    #[must_use]
    pub fn resolve(&self, current: Option<&str>) -> Option<String> {
        match self {
            Self::Keep => current.map(str::to_string),
            Self::Clear => None,
            Self::Set(id) => Some(id.clone()),
        }
    }

    #[must_use]
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

impl<'de> Deserialize<'de> for SectionRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Only reached when the key is present; a missing key is `Keep` via `#[serde(default)]`.
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(match value.as_deref().map(str::trim) {
            None | Some("") => Self::Clear,
            Some(id) => Self::Set(id.to_string()),
        })
    }
}

/// Link changes after validation. `url` and `icon` are already normalized.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkPatch {
    pub group_id: Option<String>,
    pub section: SectionRef,
    pub title: Option<String>,
    pub url: Option<String>,
    /// `Some("")` clears the description.
    pub description: Option<String>,
    /// `Some("")` asks for an icon derived from the link url.
    pub icon: Option<String>,
}

impl LinkPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.group_id.is_none()
            && self.section.is_keep()
            && self.title.is_none()
            && self.url.is_none()
            && self.description.is_none()
            && self.icon.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub site_title: Option<String>,
    pub site_subtitle: Option<String>,
    pub home_tagline: Option<String>,
    pub site_icon_data_url: Option<String>,
    pub favicon_data_url: Option<String>,
    pub site_icon_fit: Option<IconFit>,
}

impl SettingsPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.site_title.is_none()
            && self.site_subtitle.is_none()
            && self.home_tagline.is_none()
            && self.site_icon_data_url.is_none()
            && self.favicon_data_url.is_none()
            && self.site_icon_fit.is_none()
    }

    pub fn apply(self, settings: &mut Settings) {
        if let Some(value) = self.site_title {
            settings.site_title = value;
        }
        if let Some(value) = self.site_subtitle {
            settings.site_subtitle = value;
        }
        if let Some(value) = self.home_tagline {
            settings.home_tagline = value;
        }
        if let Some(value) = self.site_icon_data_url {
            settings.site_icon_data_url = value;
        }
        if let Some(value) = self.favicon_data_url {
            settings.favicon_data_url = value;
        }
        if let Some(value) = self.site_icon_fit {
            settings.site_icon_fit = value;
        }
    }
}

/// New position (and optionally new parent) for one link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkPlacement {
    pub order: i64,
    pub group_id: Option<String>,
    pub section: SectionRef,
}

/// Bulk reorder/reparent, keyed by entity id. Unknown ids are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReorderPatch {
    pub groups: HashMap<String, i64>,
    pub sections: HashMap<String, i64>,
    pub links: HashMap<String, LinkPlacement>,
}

impl ReorderPatch {
    /// Single pass over the existing entities, consulting the lookup tables.
    /// The caller normalizes afterwards.
    pub fn apply(&self, doc: &mut Document) {
        for group in &mut doc.groups {
            if let Some(order) = self.groups.get(&group.id) {
                group.order = *order;
            }
        }
        for section in &mut doc.sections {
            if let Some(order) = self.sections.get(&section.id) {
                section.order = *order;
            }
        }
        let groups = &doc.groups;
        for link in &mut doc.links {
            let Some(placement) = self.links.get(&link.id) else {
                continue;
            };
            // A move into a group that does not exist is ignored rather than
            // letting normalization drop the link.
            if let Some(group_id) = placement
                .group_id
                .as_ref()
                .filter(|id| groups.iter().any(|group| &group.id == *id))
            {
                link.group_id.clone_from(group_id);
            }
            link.section_id = placement.section.resolve(link.section_id.as_deref());
            link.order = placement.order;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{normalize, Link};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(default)]
        section: SectionRef,
    }

    #[test]
    fn section_ref_distinguishes_missing_null_and_value() {
        let missing: Wrapper = serde_json::from_value(json!({})).unwrap();
        let null: Wrapper = serde_json::from_value(json!({"section": null})).unwrap();
        let blank: Wrapper = serde_json::from_value(json!({"section": "  "})).unwrap();
        let set: Wrapper = serde_json::from_value(json!({"section": " s1 "})).unwrap();

        assert_eq!(missing.section, SectionRef::Keep);
        assert_eq!(null.section, SectionRef::Clear);
        assert_eq!(blank.section, SectionRef::Clear);
        assert_eq!(set.section, SectionRef::Set("s1".to_string()));
    }

    #[test]
    fn group_patch_applies_only_present_fields() {
        let mut group = Group {
            id: "g".to_string(),
            name: "Old".to_string(),
            order: 0,
            enabled: true,
        };
        GroupPatch {
            name: None,
            enabled: Some(false),
        }
        .apply(&mut group);
        assert_eq!(group.name, "Old");
        assert!(!group.enabled);
        assert!(GroupPatch::default().is_empty());
    }

    #[test]
    fn reorder_ignores_unknown_ids_and_reparents_links() {
        let mut doc = Document::seed();
        doc.groups.push(Group {
            id: "work".to_string(),
            name: "Work".to_string(),
            order: 1,
            enabled: true,
        });

        let patch = ReorderPatch {
            groups: HashMap::from([
                ("favorites".to_string(), 2),
                ("work".to_string(), 0),
                ("ghost".to_string(), 7),
            ]),
            sections: HashMap::new(),
            links: HashMap::from([(
                "github".to_string(),
                LinkPlacement {
                    order: 0,
                    group_id: Some("work".to_string()),
                    section: SectionRef::Keep,
                },
            )]),
        };
        patch.apply(&mut doc);
        let doc = normalize(doc);

        assert_eq!(doc.groups[0].id, "work");
        let github: &Link = doc.link("github").unwrap();
        assert_eq!(github.group_id, "work");
        assert_eq!(github.order, 0);
        assert_eq!(doc.link("rust-lang").unwrap().order, 0);
    }

    #[test]
    fn reorder_never_moves_links_into_unknown_groups() {
        let mut doc = Document::seed();
        let patch = ReorderPatch {
            links: HashMap::from([(
                "github".to_string(),
                LinkPlacement {
                    order: 0,
                    group_id: Some("ghost".to_string()),
                    section: SectionRef::Clear,
                },
            )]),
            ..ReorderPatch::default()
        };
        patch.apply(&mut doc);
        let doc = normalize(doc);

        assert_eq!(doc.links.len(), 2);
        assert_eq!(doc.link("github").unwrap().group_id, "favorites");
    }
}
