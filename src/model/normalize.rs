//! Canonical ordering and referential-integrity repair.
//!
//! After [`normalize`]:
//! - group orders are `0..n`, following the previous relative order (stable);
//! - sections of a dead group are gone, the rest are `0..m` per group;
//! - links of a dead group are gone, a `sectionId` foreign to the link's group is cleared;
//! - per group, links come bucketed by section (in section order) with the
//!   unsectioned bucket last, each bucket `0..k`;
//! - settings carry non-blank title, subtitle and tagline.
//!
//! The function is total and idempotent.

use std::collections::{HashMap, HashSet};

use super::{
    Document, Group, Link, Section, Settings, DEFAULT_HOME_TAGLINE, DEFAULT_SITE_SUBTITLE,
    DEFAULT_SITE_TITLE,
};

type Bucket = (String, Option<String>);

#[must_use]
pub fn normalize(doc: Document) -> Document {
    let Document {
        settings,
        groups,
        sections,
        links,
    } = doc;

    let groups = normalize_groups(groups);
    let sections = normalize_sections(&groups, sections);
    let links = normalize_links(&groups, &sections, links);

    Document {
        settings: normalize_settings(settings),
        groups,
        sections,
        links,
    }
}

#[must_use]
pub fn normalize_settings(settings: Settings) -> Settings {
    let fallback = |value: String, default: &str| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            default.to_string()
        } else {
            trimmed.to_string()
        }
    };

    Settings {
        site_title: fallback(settings.site_title, DEFAULT_SITE_TITLE),
        site_subtitle: fallback(settings.site_subtitle, DEFAULT_SITE_SUBTITLE),
        home_tagline: fallback(settings.home_tagline, DEFAULT_HOME_TAGLINE),
        site_icon_data_url: settings.site_icon_data_url.trim().to_string(),
        favicon_data_url: settings.favicon_data_url.trim().to_string(),
        site_icon_fit: settings.site_icon_fit,
    }
}

fn normalize_groups(mut groups: Vec<Group>) -> Vec<Group> {
    dedup_by_id(&mut groups, |group| &group.id);
    groups.sort_by_key(|group| group.order);
    for (position, group) in groups.iter_mut().enumerate() {
        group.order = dense(position);
    }
    groups
}

fn normalize_sections(groups: &[Group], mut sections: Vec<Section>) -> Vec<Section> {
    dedup_by_id(&mut sections, |section| &section.id);

    let mut by_group: HashMap<String, Vec<Section>> = HashMap::new();
    for section in sections {
        by_group
            .entry(section.group_id.clone())
            .or_default()
            .push(section);
    }

    // Sections whose group is not in `groups` are never visited below.
    let mut out = Vec::new();
    for group in groups {
        let Some(mut bucket) = by_group.remove(&group.id) else {
            continue;
        };
        bucket.sort_by_key(|section| section.order);
        for (position, mut section) in bucket.into_iter().enumerate() {
            section.order = dense(position);
            out.push(section);
        }
    }
    out
}

fn normalize_links(groups: &[Group], sections: &[Section], mut links: Vec<Link>) -> Vec<Link> {
    dedup_by_id(&mut links, |link| &link.id);

    let live_groups: HashSet<&str> = groups.iter().map(|group| group.id.as_str()).collect();
    let section_owner: HashMap<&str, &str> = sections
        .iter()
        .map(|section| (section.id.as_str(), section.group_id.as_str()))
        .collect();

    let mut buckets: HashMap<Bucket, Vec<Link>> = HashMap::new();
    for mut link in links {
        if !live_groups.contains(link.group_id.as_str()) {
            continue;
        }
        link.section_id = link
            .section_id
            .take()
            .map(|id| id.trim().to_string())
            .filter(|id| section_owner.get(id.as_str()) == Some(&link.group_id.as_str()));
        buckets
            .entry((link.group_id.clone(), link.section_id.clone()))
            .or_default()
            .push(link);
    }

    let mut out = Vec::new();
    for group in groups {
        let keys = sections
            .iter()
            .filter(|section| section.group_id == group.id)
            .map(|section| (group.id.clone(), Some(section.id.clone())))
            .chain(std::iter::once((group.id.clone(), None)));

        for key in keys {
            let Some(mut bucket) = buckets.remove(&key) else {
                continue;
            };
            bucket.sort_by_key(|link| link.order);
            for (position, mut link) in bucket.into_iter().enumerate() {
                link.order = dense(position);
                out.push(link);
            }
        }
    }
    out
}

/// Keep the first entity for every id.
fn dedup_by_id<T>(items: &mut Vec<T>, id: impl Fn(&T) -> &String) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(id(item).clone()));
}

fn dense(position: usize) -> i64 {
    i64::try_from(position).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IconFit, UNORDERED};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn group(id: &str, order: i64) -> Group {
        Group {
            id: id.to_string(),
            name: id.to_uppercase(),
            order,
            enabled: true,
        }
    }

    fn section(id: &str, group_id: &str, order: i64) -> Section {
        Section {
            id: id.to_string(),
            group_id: group_id.to_string(),
            name: id.to_string(),
            order,
        }
    }

    fn link(id: &str, group_id: &str, section_id: Option<&str>, order: i64) -> Link {
        Link {
            id: id.to_string(),
            group_id: group_id.to_string(),
            section_id: section_id.map(str::to_string),
            title: id.to_string(),
            url: format!("https://{id}.example"),
            description: None,
            icon: None,
            order,
        }
    }

    /// Documents with duplicate orders, dangling references and cross-group sections.
    fn arbitrary_document(rng: &mut StdRng) -> Document {
        let group_ids: Vec<String> = (0..rng.gen_range(0..5)).map(|i| format!("g{i}")).collect();
        let ghost = |rng: &mut StdRng, ids: &[String]| -> String {
            if ids.is_empty() || rng.gen_bool(0.15) {
                "ghost".to_string()
            } else {
                ids[rng.gen_range(0..ids.len())].clone()
            }
        };
        let order = |rng: &mut StdRng| -> i64 {
            if rng.gen_bool(0.1) {
                UNORDERED
            } else {
                rng.gen_range(-3..6)
            }
        };

        let groups = group_ids
            .iter()
            .map(|id| group(id, order(rng)))
            .collect::<Vec<_>>();

        let section_ids: Vec<String> = (0..rng.gen_range(0..7)).map(|i| format!("s{i}")).collect();
        let sections = section_ids
            .iter()
            .map(|id| {
                let owner = ghost(rng, &group_ids);
                section(id, &owner, order(rng))
            })
            .collect::<Vec<_>>();

        let links = (0..rng.gen_range(0..20))
            .map(|i| {
                let owner = ghost(rng, &group_ids);
                let section_id = if section_ids.is_empty() || rng.gen_bool(0.3) {
                    None
                } else {
                    Some(section_ids[rng.gen_range(0..section_ids.len())].clone())
                };
                link(&format!("l{i}"), &owner, section_id.as_deref(), order(rng))
            })
            .collect();

        Document {
            settings: Settings {
                site_title: if rng.gen_bool(0.5) { "  ".into() } else { " Nav ".into() },
                ..Settings::default()
            },
            groups,
            sections,
            links,
        }
    }

    fn assert_dense(orders: &[i64]) {
        let expected: Vec<i64> = (0..orders.len()).map(dense).collect();
        assert_eq!(orders, expected.as_slice());
    }

    fn assert_invariants(doc: &Document) {
        assert_dense(&doc.groups.iter().map(|g| g.order).collect::<Vec<_>>());

        for g in &doc.groups {
            let orders: Vec<i64> = doc
                .sections
                .iter()
                .filter(|s| s.group_id == g.id)
                .map(|s| s.order)
                .collect();
            assert_dense(&orders);

            let in_group = doc.links.iter().filter(|l| l.group_id == g.id);
            let mut runs: Vec<(Option<&str>, Vec<i64>)> = Vec::new();
            for l in in_group {
                match runs.last_mut() {
                    Some((sid, orders)) if *sid == l.section_id.as_deref() => orders.push(l.order),
                    _ => runs.push((l.section_id.as_deref(), vec![l.order])),
                }
            }

            let mut seen = HashSet::new();
            for (sid, orders) in &runs {
                assert!(seen.insert(*sid), "bucket split in group {}", g.id);
                assert_dense(orders);
            }
            if let Some(position) = runs.iter().position(|(sid, _)| sid.is_none()) {
                assert_eq!(position, runs.len() - 1, "unsectioned bucket not last");
            }
            let section_orders: Vec<i64> = runs
                .iter()
                .filter_map(|(sid, _)| sid.and_then(|id| doc.section(id)).map(|s| s.order))
                .collect();
            assert!(section_orders.windows(2).all(|pair| pair[0] < pair[1]));
        }

        for l in &doc.links {
            assert!(doc.group(&l.group_id).is_some(), "dangling group on {}", l.id);
            if let Some(section_id) = &l.section_id {
                let owner = doc.section(section_id).map(|s| s.group_id.as_str());
                assert_eq!(owner, Some(l.group_id.as_str()));
            }
        }
        for s in &doc.sections {
            assert!(doc.group(&s.group_id).is_some());
        }

        assert!(!doc.settings.site_title.trim().is_empty());
        assert!(!doc.settings.site_subtitle.trim().is_empty());
        assert!(!doc.settings.home_tagline.trim().is_empty());
    }

    #[test]
    fn arbitrary_documents_normalize_to_invariants_idempotently() {
        let mut rng = StdRng::seed_from_u64(0x00c1_0ad0);
        for _ in 0..500 {
            let doc = arbitrary_document(&mut rng);
            let once = normalize(doc);
            assert_invariants(&once);
            let twice = normalize(once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn groups_are_stably_renumbered() {
        let doc = Document {
            groups: vec![group("b", 5), group("a", 0), group("c", 5), group("d", UNORDERED)],
            ..Document::default()
        };
        let out = normalize(doc);
        let ids: Vec<&str> = out.groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c", "d"]);
        assert_dense(&out.groups.iter().map(|g| g.order).collect::<Vec<_>>());
    }

    #[test]
    fn removing_a_middle_group_only_renumbers_groups() {
        let doc = normalize(Document {
            groups: vec![group("a", 0), group("b", 1), group("c", 2)],
            sections: vec![section("sa", "a", 0), section("sb", "b", 0)],
            links: vec![
                link("la", "a", Some("sa"), 0),
                link("la2", "a", None, 0),
                link("lb", "b", Some("sb"), 0),
                link("lc", "c", None, 0),
            ],
            ..Document::default()
        });

        let mut without_b = doc.clone();
        without_b.groups.retain(|g| g.id != "b");
        let out = normalize(without_b);

        let groups: Vec<(&str, i64)> = out
            .groups
            .iter()
            .map(|g| (g.id.as_str(), g.order))
            .collect();
        assert_eq!(groups, [("a", 0), ("c", 1)]);
        let kept = |d: &Document| {
            (
                d.sections.iter().filter(|s| s.group_id != "b").cloned().collect::<Vec<_>>(),
                d.links.iter().filter(|l| l.group_id != "b").cloned().collect::<Vec<_>>(),
            )
        };
        assert_eq!(kept(&out), kept(&doc));
        assert!(out.sections.iter().all(|s| s.group_id != "b"));
        assert!(out.links.iter().all(|l| l.group_id != "b"));
    }

    #[test]
    fn dead_group_children_are_dropped() {
        let doc = Document {
            groups: vec![group("a", 0)],
            sections: vec![section("s1", "a", 3), section("s2", "gone", 0)],
            links: vec![link("l1", "a", Some("s1"), 9), link("l2", "gone", None, 0)],
            ..Document::default()
        };
        let out = normalize(doc);
        assert_eq!(out.sections.len(), 1);
        assert_eq!(out.sections[0].order, 0);
        assert_eq!(out.links.len(), 1);
        assert_eq!(out.links[0].id, "l1");
        assert_eq!(out.links[0].order, 0);
    }

    #[test]
    fn foreign_section_reference_is_cleared() {
        let doc = Document {
            groups: vec![group("a", 0), group("b", 1)],
            sections: vec![section("sb", "b", 0)],
            links: vec![link("l1", "a", Some("sb"), 0), link("l2", "a", Some("missing"), 1)],
            ..Document::default()
        };
        let out = normalize(doc);
        assert!(out.links.iter().all(|l| l.section_id.is_none()));
        assert_eq!(
            out.links.iter().map(|l| l.order).collect::<Vec<_>>(),
            [0, 1]
        );
    }

    #[test]
    fn unsectioned_bucket_sorts_last() {
        let doc = Document {
            groups: vec![group("a", 0)],
            sections: vec![section("s2", "a", 1), section("s1", "a", 0)],
            links: vec![
                link("loose", "a", None, 0),
                link("in-s2", "a", Some("s2"), 0),
                link("in-s1-b", "a", Some("s1"), 4),
                link("in-s1-a", "a", Some("s1"), 1),
            ],
            ..Document::default()
        };
        let out = normalize(doc);
        let ids: Vec<&str> = out.links.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["in-s1-a", "in-s1-b", "in-s2", "loose"]);
        let orders: Vec<i64> = out.links.iter().map(|l| l.order).collect();
        assert_eq!(orders, [0, 1, 0, 0]);
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let doc = Document {
            groups: vec![group("a", 0), group("a", 1)],
            ..Document::default()
        };
        assert_eq!(normalize(doc).groups.len(), 1);
    }

    #[test]
    fn settings_blank_fields_fall_back() {
        let settings = normalize_settings(Settings {
            site_title: "  ".to_string(),
            site_subtitle: " Sub ".to_string(),
            home_tagline: String::new(),
            site_icon_data_url: " https://x.dev/i.png ".to_string(),
            favicon_data_url: String::new(),
            site_icon_fit: IconFit::Cover,
        });
        assert_eq!(settings.site_title, DEFAULT_SITE_TITLE);
        assert_eq!(settings.site_subtitle, "Sub");
        assert_eq!(settings.home_tagline, DEFAULT_HOME_TAGLINE);
        assert_eq!(settings.site_icon_data_url, "https://x.dev/i.png");
        assert_eq!(settings.site_icon_fit, IconFit::Cover);
    }
}
