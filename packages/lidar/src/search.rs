//! The paginated search loop.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::client::{HttpFetcher, PageFetcher};
use crate::request::{LidarQuery, PageRequest};
use crate::response::{self, PageStatus, TnmProduct};
use crate::service::LidarService;
use crate::{LidarError, RemoteServiceError};

/// Shared flag a caller sets to stop a search between pages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// Every page was fetched.
    Complete,
    /// Stopped early by a [`CancelFlag`]; the items are what had been
    /// gathered so far.
    Cancelled,
}

/// Outcome of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct LidarSearch {
    /// Unique products in the order first seen.
    pub items: Vec<TnmProduct>,
    /// First non-zero total reported by the service. Later pages do not
    /// change it.
    pub reported_total: u64,
    /// Requests made.
    pub pages: usize,
    /// Items dropped because their id had already been seen.
    pub duplicates: usize,
    pub completion: Completion,
}

impl LidarSearch {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.completion == Completion::Cancelled
    }
}

/// Searches one service, page by page.
pub struct LidarSearchClient<F: PageFetcher = HttpFetcher> {
    service: LidarService,
    fetcher: F,
}

impl LidarSearchClient<HttpFetcher> {
    /// A client for `service` over HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`LidarError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn new(service: LidarService) -> Result<Self, LidarError> {
        let fetcher = HttpFetcher::new(&service)?;
        Ok(Self { service, fetcher })
    }
}

impl<F: PageFetcher> LidarSearchClient<F> {
    #[must_use]
    pub const fn with_fetcher(service: LidarService, fetcher: F) -> Self {
        Self { service, fetcher }
    }

    #[must_use]
    pub const fn service(&self) -> &LidarService {
        &self.service
    }

    /// Runs the search to completion or cancellation.
    ///
    /// Each request asks for the page starting at the number of unique
    /// items gathered so far. The loop ends on an empty page, once the
    /// gathered count reaches the total from the first page that reported
    /// one, or when a page adds nothing new. `cancel` is checked before every request.
    ///
    /// # Errors
    ///
    /// Any transport or parse failure aborts the whole search. An error
    /// object from the service becomes [`LidarError::RemoteService`], with
    /// the small-polygon defect singled out as
    /// [`RemoteServiceError::KnownSmallPolygonBug`].
    pub async fn search(
        &self,
        query: &LidarQuery,
        cancel: &CancelFlag,
    ) -> Result<LidarSearch, LidarError> {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut items: Vec<TnmProduct> = Vec::new();
        let mut reported_total = 0u64;
        let mut pages = 0usize;
        let mut duplicates = 0usize;

        log::info!(
            "Searching {} for LIDAR products from {} to {}",
            self.service.name,
            query.start,
            query.end
        );

        let completion = loop {
            if cancel.is_cancelled() {
                log::info!("LIDAR search cancelled after {pages} pages");
                break Completion::Cancelled;
            }

            let offset = items.len();
            let request = PageRequest::new(&self.service, query, offset);
            let raw = self.fetcher.fetch_page(&request).await?;
            pages += 1;

            let page = response::normalize(&raw, offset);
            match page.status {
                PageStatus::Ok => {}
                PageStatus::RemoteError(message) => {
                    return Err(RemoteServiceError::from_message(message, query.half_width_m).into());
                }
                PageStatus::Unrecognized(summary) => {
                    return Err(LidarError::UnrecognizedResponse { summary });
                }
            }

            if reported_total == 0 {
                reported_total = page.total;
            } else if page.total != reported_total {
                log::debug!(
                    "Page {pages} reported total {} after {reported_total}, keeping {reported_total}",
                    page.total
                );
            }
            let page_len = page.items.len();
            if page_len == 0 {
                log::info!("Page {pages} was empty, stopping");
                break Completion::Complete;
            }

            let before = items.len();
            for item in page.items {
                if seen.insert(item.source_id.clone()) {
                    items.push(item);
                }
            }
            let added = items.len() - before;
            if added < page_len {
                log::warn!(
                    "Page {pages} repeated {} items already seen",
                    page_len - added
                );
                duplicates += page_len - added;
            }

            log::info!(
                "Page {pages}: {page_len} items, {} collected of {reported_total}",
                items.len()
            );

            if items.len() as u64 >= reported_total {
                break Completion::Complete;
            }
            if added == 0 {
                log::warn!("Page {pages} added no new items, stopping");
                break Completion::Complete;
            }

            tokio::time::sleep(self.service.page_delay()).await;
        };

        Ok(LidarSearch {
            items,
            reported_total,
            pages,
            duplicates,
            completion,
        })
    }
}
