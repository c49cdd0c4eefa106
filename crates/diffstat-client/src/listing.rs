//! Pull-request listing page: the rows to enrich and where results land.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use diffstat_core::error::AppError;
use diffstat_core::models::{Fragment, Row, RowHandle, RowLink};
use diffstat_core::traits::{Fetcher, RowSink, RowSource};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

pub const ROW_SELECTOR: &str = ".js-issue-row.js-navigation-item";
pub const LINK_SELECTOR: &str = ".js-navigation-open";
pub const REVIEW_STATUS_SELECTOR: &str = ".d-inline-block > a";

/// Parses listing pages into [`Row`]s.
#[derive(Clone)]
pub struct ListingParser {
    row: Selector,
    link: Selector,
    review_status: Selector,
}

impl ListingParser {
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            row: parse_selector(ROW_SELECTOR)?,
            link: parse_selector(LINK_SELECTOR)?,
            review_status: parse_selector(REVIEW_STATUS_SELECTOR)?,
        })
    }

    /// Rows in document order. Handles are the row's position.
    pub fn parse(&self, html: &str) -> Vec<Row> {
        let document = Html::parse_document(html);
        document
            .select(&self.row)
            .enumerate()
            .map(|(i, row)| Row {
                handle: RowHandle(i),
                link: self.link_of(row),
                review_status: row
                    .select(&self.review_status)
                    .next()
                    .map(|status| element_text(&status)),
            })
            .collect()
    }

    fn link_of(&self, row: ElementRef<'_>) -> Option<RowLink> {
        let anchor = row.select(&self.link).next()?;
        Some(RowLink {
            href: anchor.value().attr("href").unwrap_or_default().to_string(),
            title: element_text(&anchor),
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector)
        .map_err(|e| AppError::ConfigError(format!("Invalid selector '{selector}': {e}")))
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// [`RowSource`] that re-fetches a listing page on every readiness check.
///
/// A failed fetch is logged and reported as "no rows yet", so the poller's
/// retry and time budgets decide when to give up.
pub struct ListingSource<F> {
    fetcher: F,
    url: String,
    parser: ListingParser,
}

impl<F: Fetcher> ListingSource<F> {
    pub fn new(fetcher: F, url: impl Into<String>) -> Result<Self, AppError> {
        Ok(Self {
            fetcher,
            url: url.into(),
            parser: ListingParser::new()?,
        })
    }
}

impl<F: Fetcher> RowSource for ListingSource<F> {
    async fn list_rows(&self) -> Vec<Row> {
        match self.fetcher.fetch(&self.url).await {
            Ok(html) => self.parser.parse(&html),
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(url = %self.url, error = %e, "Listing fetch failed, will retry");
                } else {
                    tracing::error!(url = %self.url, error = %e, "Listing fetch failed");
                }
                Vec::new()
            }
        }
    }
}

/// Presentation and diffstat state of one row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub handle: usize,
    pub title: Option<String>,
    pub href: Option<String>,
    /// Set when the review status reads "Approved".
    pub approved: bool,
    pub diffstat: Option<String>,
}

/// In-memory [`RowSink`] standing in for the rendered page.
#[derive(Clone, Default)]
pub struct PageStore {
    rows: Arc<Mutex<BTreeMap<RowHandle, RowView>>>,
}

impl PageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows in handle order.
    pub fn snapshot(&self) -> Vec<RowView> {
        self.lock_rows().values().cloned().collect()
    }

    fn lock_rows(&self) -> MutexGuard<'_, BTreeMap<RowHandle, RowView>> {
        self.rows.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned page store mutex");
            poisoned.into_inner()
        })
    }
}

impl RowSink for PageStore {
    fn has_existing_result(&self, row: RowHandle) -> bool {
        self.lock_rows()
            .get(&row)
            .is_some_and(|view| view.diffstat.is_some())
    }

    fn apply_result(&self, row: RowHandle, fragment: &Fragment) {
        let mut rows = self.lock_rows();
        let view = rows.entry(row).or_insert_with(|| RowView {
            handle: row.0,
            ..RowView::default()
        });
        view.diffstat = Some(fragment.as_str().to_string());
    }

    fn apply_presentation(&self, row: &Row) {
        let mut rows = self.lock_rows();
        let view = rows.entry(row.handle).or_insert_with(|| RowView {
            handle: row.handle.0,
            ..RowView::default()
        });
        view.title = row.link.as_ref().map(|l| l.title.clone());
        view.href = row.link.as_ref().map(|l| l.href.clone());
        view.approved = row
            .review_status
            .as_deref()
            .is_some_and(|status| status.contains("Approve"));
    }
}
