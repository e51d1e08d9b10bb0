//! Grouping tiles into collection projects, and display helpers.
//!
//! USGS tile names follow `USGS_LPC_<STATE>_<PROJECT>_<YEAR>_<TILE...>`.
//! The project key is everything up to and including the year; names
//! without a year are cut before the first tile-coordinate token.

use std::collections::BTreeMap;

use crate::response::TnmProduct;

fn is_year(part: &str) -> bool {
    part.len() == 4
        && part.bytes().all(|b| b.is_ascii_digit())
        && part.parse::<u32>().is_ok_and(|y| (2000..=2100).contains(&y))
}

fn is_all_digits(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

/// The last path segment of a download URL, without any query string.
#[must_use]
pub fn file_name_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

/// Derives the project key from a tile file name.
#[must_use]
pub fn project_name(file_name: &str) -> String {
    let base = file_name.split('.').next().unwrap_or(file_name);
    let parts: Vec<&str> = base.split('_').collect();

    if let Some(year) = parts.iter().position(|p| is_year(p)) {
        return parts[..=year].join("_");
    }

    if file_name.starts_with("USGS_")
        && parts.len() > 3
        && let Some(tile) = parts
            .iter()
            .skip(3)
            .position(|p| p.starts_with(|c: char| c.is_ascii_digit()))
    {
        return parts[..tile + 3].join("_");
    }

    if let Some(coord) = parts
        .iter()
        .skip(2)
        .position(|p| p.len() >= 4 && is_all_digits(p))
    {
        return parts[..coord + 2].join("_");
    }

    if parts.len() > 2 {
        return parts[..parts.len() - 1].join("_");
    }

    log::debug!("Could not derive a project from {file_name}, using the full name");
    base.to_string()
}

/// Groups products by [`project_name`] of their download file. Products
/// without a download URL are left out.
#[must_use]
pub fn group_by_project(items: &[TnmProduct]) -> BTreeMap<String, Vec<&TnmProduct>> {
    let mut groups: BTreeMap<String, Vec<&TnmProduct>> = BTreeMap::new();
    for item in items {
        if let Some(project) = item.project() {
            groups.entry(project).or_default().push(item);
        }
    }
    groups
}

/// Human-readable size: bytes below 1 KB, one decimal for KB and MB, two
/// for GB.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let size = bytes as f64;
    if size < KB {
        format!("{bytes} B")
    } else if size < MB {
        format!("{:.1} KB", size / KB)
    } else if size < GB {
        format!("{:.1} MB", size / MB)
    } else {
        format!("{:.2} GB", size / GB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::normalize;
    use serde_json::json;

    #[test]
    fn project_ends_at_year() {
        assert_eq!(
            project_name("USGS_LPC_PA_Allegheny_2017_LAS_17N_1234_5678.laz"),
            "USGS_LPC_PA_Allegheny_2017"
        );
        assert_eq!(
            project_name("USGS_LPC_NY_Region2Lot1_2012_18TWN123456.laz"),
            "USGS_LPC_NY_Region2Lot1_2012"
        );
    }

    #[test]
    fn project_without_year_stops_at_tile_token() {
        assert_eq!(
            project_name("USGS_LPC_MA_ME_MA_18TYN1234.laz"),
            "USGS_LPC_MA_ME_MA"
        );
    }

    #[test]
    fn non_usgs_name_stops_at_coordinate() {
        assert_eq!(project_name("ohio_state_lidar_4455_123.laz"), "ohio_state_lidar");
    }

    #[test]
    fn short_names_keep_everything_but_the_last_part() {
        assert_eq!(project_name("alpha_beta_gamma.laz"), "alpha_beta");
        assert_eq!(project_name("tile.laz"), "tile");
    }

    #[test]
    fn file_name_ignores_query_string() {
        assert_eq!(
            file_name_from_url("https://x.test/a/b/USGS_LPC_X_2019_1.laz?sig=1"),
            Some("USGS_LPC_X_2019_1.laz")
        );
        assert_eq!(file_name_from_url("https://x.test/dir/"), None);
    }

    #[test]
    fn groups_products_by_project() {
        let page = normalize(
            &json!([
                {"sourceId": "1", "downloadURL": "https://x.test/USGS_LPC_PA_A_2017_1.laz"},
                {"sourceId": "2", "downloadURL": "https://x.test/USGS_LPC_PA_A_2017_2.laz"},
                {"sourceId": "3", "downloadURL": "https://x.test/USGS_LPC_PA_B_2019_1.laz"},
                {"sourceId": "4"}
            ]),
            0,
        );
        let groups = group_by_project(&page.items);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["USGS_LPC_PA_A_2017"].len(), 2);
        assert_eq!(groups["USGS_LPC_PA_B_2019"].len(), 1);
    }

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(2048), "2.0 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
