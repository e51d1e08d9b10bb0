//! Running one corridor through every configured backend.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use link_corridor_geometry::corridor;
use link_corridor_geometry_models::{CorridorSpec, Polygon};
use link_corridor_lidar::projects::group_by_project;
use link_corridor_lidar::{
    CancelFlag, Completion, HttpFetcher, LidarQuery, LidarSearchClient, PageFetcher, TnmProduct,
};
use link_corridor_search_models::{SearchItem, SearchSource};
use link_corridor_towers::{TowerFilters, TowerRecord, TowerStore};
use link_corridor_turbines::{Turbine, TurbineStore};
use serde::Serialize;

use crate::SearchError;
use crate::aggregate;

/// What to search for along one corridor.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub spec: CorridorSpec,
    pub sources: BTreeSet<SearchSource>,
    pub tower_filters: TowerFilters,
    /// Acquisition date range for LIDAR; LIDAR is skipped without one.
    pub lidar_dates: Option<(NaiveDate, NaiveDate)>,
}

impl SearchRequest {
    /// A request covering every source, with no filters and no LIDAR
    /// date range.
    #[must_use]
    pub fn new(spec: CorridorSpec) -> Self {
        Self {
            spec,
            sources: [SearchSource::Tower, SearchSource::Turbine, SearchSource::Lidar]
                .into_iter()
                .collect(),
            tower_filters: TowerFilters::default(),
            lidar_dates: None,
        }
    }

    #[must_use]
    pub fn with_sources(mut self, sources: impl IntoIterator<Item = SearchSource>) -> Self {
        self.sources = sources.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_tower_filters(mut self, filters: TowerFilters) -> Self {
        self.tower_filters = filters;
        self
    }

    #[must_use]
    pub const fn with_lidar_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.lidar_dates = Some((start, end));
        self
    }

    /// The same request at a different half-width.
    #[must_use]
    pub fn with_half_width_m(mut self, half_width_m: f64) -> Self {
        self.spec = self.spec.with_half_width_m(half_width_m);
        self
    }

    fn wants(&self, source: SearchSource) -> bool {
        self.sources.contains(&source)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LidarOutcome {
    pub completion: Completion,
    pub pages: usize,
    pub reported_total: u64,
    pub duplicates: usize,
}

/// Merged results for one corridor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchReport {
    pub spec: CorridorSpec,
    pub polygon: Polygon,
    /// Every item found, nearest to the start first.
    pub items: Vec<SearchItem>,
    pub counts: BTreeMap<SearchSource, usize>,
    /// Present when LIDAR was searched.
    pub lidar: Option<LidarOutcome>,
    /// LIDAR tile ids grouped by the collection project derived from each
    /// tile's file name. Tiles without a download URL are not listed.
    pub projects: BTreeMap<String, Vec<String>>,
}

impl SearchReport {
    /// `true` when the LIDAR search stopped early.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.lidar
            .as_ref()
            .is_some_and(|l| l.completion == Completion::Cancelled)
    }

    /// Items from one backend, in report order.
    #[must_use]
    pub fn items_from(&self, source: SearchSource) -> Vec<&SearchItem> {
        self.items.iter().filter(|i| i.source == source).collect()
    }
}

/// The backends a search may use. Any of them may be absent; requested
/// sources without a backend are skipped with a log message.
pub struct CorridorSearch<F: PageFetcher = HttpFetcher> {
    towers: Option<TowerStore>,
    turbines: Option<TurbineStore>,
    lidar: Option<LidarSearchClient<F>>,
}

impl CorridorSearch<HttpFetcher> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            towers: None,
            turbines: None,
            lidar: None,
        }
    }
}

impl Default for CorridorSearch<HttpFetcher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: PageFetcher> CorridorSearch<F> {
    #[must_use]
    pub fn with_towers(mut self, store: TowerStore) -> Self {
        self.towers = Some(store);
        self
    }

    #[must_use]
    pub fn with_turbines(mut self, store: TurbineStore) -> Self {
        self.turbines = Some(store);
        self
    }

    /// Swaps in a LIDAR client, possibly with a different transport.
    #[must_use]
    pub fn with_lidar<G: PageFetcher>(self, client: LidarSearchClient<G>) -> CorridorSearch<G> {
        CorridorSearch {
            towers: self.towers,
            turbines: self.turbines,
            lidar: Some(client),
        }
    }

    /// The tower store, e.g. to import into after
    /// [`SearchError::StoreNotReady`].
    pub const fn towers_mut(&mut self) -> Option<&mut TowerStore> {
        self.towers.as_mut()
    }

    /// Builds the corridor and queries each requested backend in turn:
    /// towers, turbines, then LIDAR.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] from the first backend that fails; results
    /// from earlier backends are discarded. [`SearchError::Cancelled`] is
    /// returned if `cancel` is set before LIDAR starts; once LIDAR has
    /// started, cancellation yields a partial report instead.
    pub async fn run(
        &self,
        request: &SearchRequest,
        cancel: &CancelFlag,
    ) -> Result<SearchReport, SearchError> {
        let polygon = corridor::build(&request.spec)?;
        let mut items: Vec<SearchItem> = Vec::new();

        if request.wants(SearchSource::Tower) {
            match &self.towers {
                Some(store) => {
                    let towers = store.query(&polygon, &request.tower_filters)?;
                    items.extend(towers.iter().map(TowerRecord::to_search_item));
                }
                None => log::info!("No tower store configured, skipping towers"),
            }
        }

        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        if request.wants(SearchSource::Turbine) {
            match &self.turbines {
                Some(store) => {
                    items.extend(store.query(&polygon).into_iter().map(Turbine::to_search_item));
                }
                None => log::info!("No turbine dataset configured, skipping turbines"),
            }
        }

        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let mut lidar = None;
        let mut projects: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if request.wants(SearchSource::Lidar) {
            match (&self.lidar, request.lidar_dates) {
                (Some(client), Some((start, end))) => {
                    let query = LidarQuery::for_corridor(&request.spec, polygon, start, end);
                    let found = client.search(&query, cancel).await?;
                    items.extend(found.items.iter().map(TnmProduct::to_search_item));
                    projects = group_by_project(&found.items)
                        .into_iter()
                        .map(|(project, tiles)| {
                            let ids: Vec<String> =
                                tiles.iter().map(|t| t.source_id.clone()).collect();
                            (project, ids)
                        })
                        .collect();
                    lidar = Some(LidarOutcome {
                        completion: found.completion,
                        pages: found.pages,
                        reported_total: found.reported_total,
                        duplicates: found.duplicates,
                    });
                }
                (None, _) => log::info!("No LIDAR client configured, skipping LIDAR"),
                (Some(_), None) => log::info!("No LIDAR date range given, skipping LIDAR"),
            }
        }

        let mut items = aggregate::dedupe(items);
        aggregate::sort_by_distance(&mut items, request.spec.start);
        let counts = aggregate::count_by_source(&items);

        log::info!(
            "Corridor search found {} items ({} towers, {} turbines, {} LIDAR tiles)",
            items.len(),
            counts.get(&SearchSource::Tower).copied().unwrap_or(0),
            counts.get(&SearchSource::Turbine).copied().unwrap_or(0),
            counts.get(&SearchSource::Lidar).copied().unwrap_or(0),
        );

        Ok(SearchReport {
            spec: request.spec,
            polygon,
            items,
            counts,
            lidar,
            projects,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use link_corridor_geometry_models::GeoPoint;
    use link_corridor_lidar::request::PageRequest;
    use link_corridor_lidar::service::default_service;
    use link_corridor_lidar::{LidarError, RemoteServiceError};
    use serde_json::{Value, json};

    const TURBINES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-79.5, 40.001] },
                "properties": { "case_id": 1, "t_state": "PA", "p_name": "Ridge" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-79.9, 40.0005] },
                "properties": { "case_id": 2, "t_state": "PA", "p_name": "Ridge" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-79.5, 40.2] },
                "properties": { "case_id": 3, "t_state": "PA", "p_name": "Ridge" }
            }
        ]
    }"#;

    struct StaticFetcher(Value);

    impl PageFetcher for StaticFetcher {
        async fn fetch_page(&self, _request: &PageRequest) -> Result<Value, LidarError> {
            Ok(self.0.clone())
        }
    }

    fn spec() -> CorridorSpec {
        CorridorSpec::new(
            GeoPoint::new(40.0, -80.0),
            GeoPoint::new(40.0, -79.0),
            500.0,
            0.0,
        )
    }

    fn dates() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    fn lidar_client(body: Value) -> LidarSearchClient<StaticFetcher> {
        LidarSearchClient::with_fetcher(
            default_service().unwrap().with_page_delay_ms(0),
            StaticFetcher(body),
        )
    }

    #[tokio::test]
    async fn merges_turbines_and_lidar_nearest_first() {
        let search = CorridorSearch::new()
            .with_turbines(TurbineStore::from_geojson_str(TURBINES).unwrap())
            .with_lidar(lidar_client(json!({
                "items": [{"sourceId": "tile-1", "title": "Tile 1",
                           "boundingBox": {"minX": -79.3, "minY": 39.99, "maxX": -79.2, "maxY": 40.01}}],
                "total": 1
            })));
        let (start, end) = dates();
        let request = SearchRequest::new(spec()).with_lidar_dates(start, end);

        let report = search.run(&request, &CancelFlag::new()).await.unwrap();

        let ids: Vec<&str> = report.items.iter().map(|i| i.source_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "tile-1"]);
        assert_eq!(report.counts[&SearchSource::Turbine], 2);
        assert_eq!(report.counts[&SearchSource::Lidar], 1);
        assert!(!report.is_partial());
        assert!(report.projects.is_empty());
    }

    #[tokio::test]
    async fn lidar_tiles_are_grouped_by_project() {
        let search = CorridorSearch::new().with_lidar(lidar_client(json!({
            "items": [
                {"sourceId": "a1", "downloadURL": "https://x.test/USGS_LPC_PA_West_2019_e1_n1.laz"},
                {"sourceId": "a2", "downloadURL": "https://x.test/USGS_LPC_PA_West_2019_e2_n1.laz"},
                {"sourceId": "b1", "downloadURL": "https://x.test/USGS_LPC_PA_South_2021_e1_n1.laz"},
                {"sourceId": "c1", "title": "No download"}
            ],
            "total": 4
        })));
        let (start, end) = dates();
        let request = SearchRequest::new(spec())
            .with_sources([SearchSource::Lidar])
            .with_lidar_dates(start, end);

        let report = search.run(&request, &CancelFlag::new()).await.unwrap();

        assert_eq!(report.items_from(SearchSource::Lidar).len(), 4);
        assert_eq!(report.projects.len(), 2);
        assert_eq!(report.projects["USGS_LPC_PA_West_2019"], vec!["a1", "a2"]);
        assert_eq!(report.projects["USGS_LPC_PA_South_2021"], vec!["b1"]);
    }

    #[tokio::test]
    async fn unimported_tower_store_is_not_an_empty_result() {
        let search = CorridorSearch::new().with_towers(TowerStore::open_in_memory().unwrap());
        let request = SearchRequest::new(spec()).with_sources([SearchSource::Tower]);

        let err = search.run(&request, &CancelFlag::new()).await.unwrap_err();
        assert!(err.is_store_not_ready());
    }

    #[tokio::test]
    async fn degenerate_corridor_fails_before_any_backend() {
        let point = GeoPoint::new(40.0, -80.0);
        let search = CorridorSearch::new().with_towers(TowerStore::open_in_memory().unwrap());
        let request = SearchRequest::new(CorridorSpec::new(point, point, 500.0, 0.0));

        let err = search.run(&request, &CancelFlag::new()).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidGeometry(_)));
    }

    #[tokio::test]
    async fn small_polygon_failure_surfaces_retry() {
        let search = CorridorSearch::new().with_lidar(lidar_client(json!({
            "errorMessage": "'str' object has no attribute 'get'"
        })));
        let (start, end) = dates();
        let request = SearchRequest::new(spec()).with_lidar_dates(start, end);

        let err = search.run(&request, &CancelFlag::new()).await.unwrap_err();
        assert!(matches!(
            err,
            SearchError::RemoteService(RemoteServiceError::KnownSmallPolygonBug { .. })
        ));

        let retry = request.clone().with_half_width_m(err.suggested_half_width_m().unwrap());
        assert!((retry.spec.half_width_m - 1000.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn cancelled_before_lidar_is_an_error() {
        let flag = CancelFlag::new();
        flag.cancel();
        let search = CorridorSearch::new()
            .with_turbines(TurbineStore::from_geojson_str(TURBINES).unwrap());

        let err = search
            .run(&SearchRequest::new(spec()), &flag)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Cancelled));
    }

    #[tokio::test]
    async fn lidar_without_dates_is_skipped() {
        let search = CorridorSearch::new().with_lidar(lidar_client(json!({"error": "unused"})));
        let report = search
            .run(&SearchRequest::new(spec()), &CancelFlag::new())
            .await
            .unwrap();
        assert!(report.items.is_empty());
        assert!(report.lidar.is_none());
    }
}
