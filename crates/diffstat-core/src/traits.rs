use std::future::Future;

use crate::error::AppError;
use crate::models::{Fragment, Row, RowHandle};

/// Fetches the raw body behind a locator.
pub trait Fetcher: Send + Sync + Clone + 'static {
    fn fetch(&self, locator: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Finds the result fragment inside a fetched page.
pub trait FragmentExtractor: Send + Sync + Clone + 'static {
    /// Returns `Ok(None)` when the page simply has no fragment.
    fn extract(&self, html: &str) -> Result<Option<Fragment>, AppError>;
}

/// Reports the rows currently present on the page.
///
/// Must be idempotent and side-effect-free. Implementations that can fail
/// log the failure and report no rows, so the poller keeps waiting.
pub trait RowSource: Send + Sync {
    fn list_rows(&self) -> impl Future<Output = Vec<Row>> + Send;
}

/// Receives presentation and fetched fragments for rows.
///
/// Every call targets a single row, and calls for distinct rows commute,
/// so results may be applied in any completion order.
pub trait RowSink: Send + Sync + Clone + 'static {
    fn has_existing_result(&self, row: RowHandle) -> bool;

    fn apply_result(&self, row: RowHandle, fragment: &Fragment);

    /// Called once per row each time readiness succeeds.
    fn apply_presentation(&self, row: &Row);
}

