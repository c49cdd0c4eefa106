//! The fetch boundary: one network retrieval per work item.
//!
//! [`DiffstatFetcher::fetch`] never fails outward. Transport errors, parse
//! errors and timeouts are logged here and folded into
//! [`FetchResult::Absent`], so every dispatched fetch settles and the
//! scheduler's drain loop always terminates.

use std::time::Duration;

use crate::error::AppError;
use crate::models::{AbsentReason, FetchResult, Fragment, WorkItem};
use crate::traits::{Fetcher, FragmentExtractor, RowSink};

/// Composes a [`Fetcher`] and a [`FragmentExtractor`] behind an
/// infallible, optionally time-bounded, fetch.
#[derive(Clone)]
pub struct DiffstatFetcher<F, X> {
    fetcher: F,
    extractor: X,
    timeout: Option<Duration>,
}

impl<F: Fetcher, X: FragmentExtractor> DiffstatFetcher<F, X> {
    pub fn new(fetcher: F, extractor: X) -> Self {
        Self {
            fetcher,
            extractor,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch the page behind `item`, extract its fragment and, if one is
    /// found, attach it to the item's row through `sink`.
    pub async fn fetch<S: RowSink>(&self, item: &WorkItem, sink: &S) -> FetchResult {
        let attempt = self.fetch_fragment(item.locator());

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, attempt).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(
                        locator = %item.locator(),
                        timeout_ms = %limit.as_millis(),
                        "Diffstat fetch timed out"
                    );
                    return FetchResult::Absent(AbsentReason::TimedOut);
                }
            },
            None => attempt.await,
        };

        match outcome {
            Ok(Some(fragment)) => {
                sink.apply_result(item.row(), &fragment);
                FetchResult::Applied(fragment)
            }
            Ok(None) => FetchResult::Absent(AbsentReason::NotFound),
            Err(e) => {
                tracing::error!(locator = %item.locator(), error = %e, "Failed to load diffstat");
                FetchResult::Absent(AbsentReason::Failed)
            }
        }
    }

    async fn fetch_fragment(&self, locator: &str) -> Result<Option<Fragment>, AppError> {
        let html = self.fetcher.fetch(locator).await?;
        self.extractor.extract(&html)
    }
}
