//! Interactive corridor search: builds the backends from config, runs the
//! search, and offers the fixes for the two recoverable failures.

use link_corridor_cli_utils::{IndicatifProgress, MultiProgress, confirm};
use link_corridor_geometry::units::meters_to_feet;
use link_corridor_lidar::{CancelFlag, LidarSearchClient};
use link_corridor_search::{CorridorSearch, SearchConfig, SearchReport, SearchRequest};
use link_corridor_search_models::SearchSource;
use link_corridor_towers::TowerStore;
use link_corridor_turbines::TurbineStore;

use crate::report;

/// Opens a backend for each requested source. A missing turbine dataset
/// is skipped rather than treated as an error.
fn build_search(
    config: &SearchConfig,
    request: &SearchRequest,
) -> Result<CorridorSearch, Box<dyn std::error::Error>> {
    let mut search = CorridorSearch::new();

    if request.sources.contains(&SearchSource::Tower) {
        search = search.with_towers(TowerStore::open(&config.tower_db)?);
    }

    if request.sources.contains(&SearchSource::Turbine) {
        if config.turbine_dataset.exists() {
            search = search.with_turbines(TurbineStore::load(&config.turbine_dataset)?);
        } else {
            log::warn!(
                "Turbine dataset {} not found, skipping turbines",
                config.turbine_dataset.display()
            );
        }
    }

    if request.sources.contains(&SearchSource::Lidar) {
        let service = config.lidar_service()?;
        log::debug!("Using LIDAR service {} at {}", service.id, service.base_url);
        search = search.with_lidar(LidarSearchClient::new(service)?);
    }

    Ok(search)
}

/// Sets `cancel` on Ctrl-C so a long LIDAR search returns what it has.
fn cancel_on_ctrl_c(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Cancelling search");
            cancel.cancel();
        }
    });
}

fn import_towers(
    search: &mut CorridorSearch,
    config: &SearchConfig,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = search
        .towers_mut()
        .ok_or("Tower search is not enabled for this run")?;
    let progress = IndicatifProgress::import_bar(multi, "Importing FCC records");
    store.ensure_imported(&config.fcc_records_dir, progress.as_ref())?;
    Ok(())
}

/// Runs `request`, prompting when the tower database needs importing or
/// the LIDAR service needs a wider corridor. Each prompt is offered at
/// most once.
///
/// # Errors
///
/// Returns the search failure, rendered for the user, when it cannot be
/// recovered from or the user declines.
pub async fn run(
    config: &SearchConfig,
    multi: &MultiProgress,
    mut request: SearchRequest,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut search = build_search(config, &request)?;
    let cancel = CancelFlag::new();
    cancel_on_ctrl_c(cancel.clone());

    let mut offered_import = false;
    let mut offered_retry = false;

    let report: SearchReport = loop {
        let spinner = IndicatifProgress::search_spinner(multi, "Searching corridor");
        let result = search.run(&request, &cancel).await;
        spinner.finish_and_clear();

        let err = match result {
            Ok(report) => break report,
            Err(e) => e,
        };

        if err.is_store_not_ready() && !offered_import {
            offered_import = true;
            eprintln!("{}", err.user_message());
            if confirm(multi, "Import the FCC tower records now?", true)? {
                import_towers(&mut search, config, multi)?;
                continue;
            }
            if confirm(multi, "Continue without towers?", true)? {
                request.sources.remove(&SearchSource::Tower);
                continue;
            }
            return Err(err.user_message().into());
        }

        if !offered_retry && let Some(half_width_m) = err.suggested_half_width_m() {
            offered_retry = true;
            eprintln!("{}", err.user_message());
            let prompt = format!(
                "Retry with a {:.0} ft half-width?",
                meters_to_feet(half_width_m)
            );
            if confirm(multi, &prompt, true)? {
                log::info!("Retrying with half-width {half_width_m:.0} m");
                request = request.with_half_width_m(half_width_m);
                continue;
            }
        }

        return Err(err.user_message().into());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report::print(&report);
    }
    Ok(())
}
