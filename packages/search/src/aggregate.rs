//! Merging results from several backends.

use std::collections::{BTreeMap, BTreeSet};

use link_corridor_geometry::geodesy;
use link_corridor_geometry_models::GeoPoint;
use link_corridor_search_models::{SearchItem, SearchSource};

/// Drops items whose `(source, source_id)` has already appeared, keeping
/// the first occurrence and the original order.
#[must_use]
pub fn dedupe(items: Vec<SearchItem>) -> Vec<SearchItem> {
    let mut seen: BTreeSet<(SearchSource, String)> = BTreeSet::new();
    let before = items.len();

    let unique: Vec<SearchItem> = items
        .into_iter()
        .filter(|item| seen.insert((item.source, item.source_id.clone())))
        .collect();

    if unique.len() < before {
        log::debug!("Dropped {} duplicate search items", before - unique.len());
    }
    unique
}

/// Items grouped by backend.
#[must_use]
pub fn group_by_source(items: &[SearchItem]) -> BTreeMap<SearchSource, Vec<&SearchItem>> {
    let mut groups: BTreeMap<SearchSource, Vec<&SearchItem>> = BTreeMap::new();
    for item in items {
        groups.entry(item.source).or_default().push(item);
    }
    groups
}

/// Item counts per backend.
#[must_use]
pub fn count_by_source(items: &[SearchItem]) -> BTreeMap<SearchSource, usize> {
    group_by_source(items)
        .into_iter()
        .map(|(source, group)| (source, group.len()))
        .collect()
}

/// Sorts by great-circle distance from `origin` to each item's
/// [`SearchItem::location`]. Items without one go last.
pub fn sort_by_distance(items: &mut [SearchItem], origin: GeoPoint) {
    items.sort_by(|a, b| {
        let da = a.location().map_or(f64::INFINITY, |p| geodesy::distance_m(origin, p));
        let db = b.location().map_or(f64::INFINITY, |p| geodesy::distance_m(origin, p));
        da.total_cmp(&db)
    });
}
