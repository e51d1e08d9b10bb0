//! HTTP transport for page requests.

use serde_json::Value;

use crate::LidarError;
use crate::request::PageRequest;
use crate::service::LidarService;

/// Longest slice of an error body kept for messages.
const ERROR_BODY_LIMIT: usize = 500;

/// Fetches one page of the products endpoint as raw JSON.
///
/// The search loop is written against this trait so it can be driven by an
/// in-process fake in tests.
pub trait PageFetcher: Send + Sync {
    /// Performs one request.
    ///
    /// # Errors
    ///
    /// Returns [`LidarError::Transport`] on network failure or timeout,
    /// [`LidarError::HttpStatus`] for a non-success status without a JSON
    /// error body, and [`LidarError::MalformedResponse`] if the body is not
    /// JSON.
    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> impl std::future::Future<Output = Result<Value, LidarError>> + Send;
}

/// [`PageFetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    /// Builds a client with the service's request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LidarError::Transport`] if the client cannot be built.
    pub fn new(service: &LidarService) -> Result<Self, LidarError> {
        let client = reqwest::Client::builder()
            .timeout(service.timeout())
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            base_url: service.base_url.clone(),
        })
    }
}

fn truncate(body: &str) -> String {
    body.char_indices()
        .nth(ERROR_BODY_LIMIT)
        .map_or_else(|| body.to_string(), |(i, _)| format!("{}...", &body[..i]))
}

impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Value, LidarError> {
        log::debug!(
            "GET {} offset={} maxResults={}",
            self.base_url,
            request.offset,
            request.page_size
        );

        let resp = self
            .client
            .get(&self.base_url)
            .query(&request.params)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            // Service errors often come back as a JSON body with a 4xx/5xx
            // status; hand those on so the error text can be inspected.
            if let Ok(value) = serde_json::from_str::<Value>(&body)
                && value
                    .as_object()
                    .is_some_and(|o| o.contains_key("error") || o.contains_key("errorMessage"))
            {
                log::warn!("Products service answered {status} with an error body");
                return Ok(value);
            }

            return Err(LidarError::HttpStatus {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn truncate_cuts_long_bodies() {
        let long = "x".repeat(ERROR_BODY_LIMIT + 10);
        let cut = truncate(&long);
        assert_eq!(cut.len(), ERROR_BODY_LIMIT + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn client_builds_for_default_service() {
        let service = crate::service::default_service().unwrap();
        assert!(HttpFetcher::new(&service).is_ok());
    }
}
