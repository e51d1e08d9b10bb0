//! Plain-text rendering of a [`SearchReport`].

use link_corridor_geometry::geodesy::distance_m;
use link_corridor_geometry::units::meters_to_feet;
use link_corridor_geometry_models::GeoPoint;
use link_corridor_lidar::projects::format_file_size;
use link_corridor_search::SearchReport;
use link_corridor_search_models::{SearchItem, SearchSource};

pub fn print(report: &SearchReport) {
    let spec = &report.spec;
    let bounds = report.polygon.bounding_box();
    println!(
        "Corridor {:.2} km long, {:.0} ft half-width, {:.0} ft extension",
        distance_m(spec.start, spec.end) / 1000.0,
        meters_to_feet(spec.half_width_m),
        meters_to_feet(spec.extension_m),
    );
    println!(
        "Bounds: lat {:.5}..{:.5}, lon {:.5}..{:.5}",
        bounds.min_lat, bounds.max_lat, bounds.min_lon, bounds.max_lon
    );

    if report.items.is_empty() {
        println!("\nNo items found in the corridor.");
    }

    for source in [SearchSource::Tower, SearchSource::Turbine, SearchSource::Lidar] {
        let items = report.items_from(source);
        if items.is_empty() {
            continue;
        }
        println!("\n{} ({})", heading(source), items.len());
        for item in items {
            println!("  {}", line(item, spec.start));
        }
    }

    if !report.projects.is_empty() {
        println!("\nLIDAR projects");
        for (project, tiles) in &report.projects {
            println!("  {project}: {} tiles", tiles.len());
        }
    }

    if let Some(lidar) = &report.lidar {
        println!(
            "\nLIDAR: {} pages, {} reported by the service",
            lidar.pages, lidar.reported_total
        );
    }
    if report.is_partial() {
        println!("LIDAR search was cancelled; the LIDAR results above are incomplete.");
    }
}

const fn heading(source: SearchSource) -> &'static str {
    match source {
        SearchSource::Tower => "Towers",
        SearchSource::Turbine => "Wind turbines",
        SearchSource::Lidar => "LIDAR tiles",
    }
}

fn line(item: &SearchItem, origin: GeoPoint) -> String {
    let distance = item
        .location()
        .map(|p| format!("{:>7.2} km", distance_m(origin, p) / 1000.0))
        .unwrap_or_default();

    let detail = match item.source {
        SearchSource::Tower => item
            .attribute_f64("overallHeightGroundM")
            .map(|m| format!("{:.0} ft AGL", meters_to_feet(m))),
        SearchSource::Turbine => item
            .attribute_f64("totalHeightM")
            .map(|m| format!("{:.0} ft tip height", meters_to_feet(m))),
        SearchSource::Lidar => item
            .attributes
            .get("sizeInBytes")
            .and_then(serde_json::Value::as_u64)
            .map(format_file_size),
    }
    .unwrap_or_default();

    format!("{distance}  {}  {}  {detail}", item.source_id, item.title)
}
