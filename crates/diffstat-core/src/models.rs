use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

/// Identifies one row of a listing snapshot.
///
/// Handles are positional and unique within a snapshot, so every result
/// written through a handle targets a distinct row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RowHandle(pub usize);

impl fmt::Display for RowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row#{}", self.0)
    }
}

/// The anchor a row's fetch target is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowLink {
    pub href: String,
    pub title: String,
}

/// One row as reported by a [`RowSource`](crate::traits::RowSource).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub handle: RowHandle,
    pub link: Option<RowLink>,
    /// Text of the row's review-status badge, if it has one.
    pub review_status: Option<String>,
}

impl Row {
    pub fn new(handle: RowHandle, href: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            handle,
            link: Some(RowLink {
                href: href.into(),
                title: title.into(),
            }),
            review_status: None,
        }
    }

    pub fn with_review_status(mut self, status: impl Into<String>) -> Self {
        self.review_status = Some(status.into());
        self
    }

    /// Returns the work item for this row, or `None` when the row is
    /// malformed (no link, empty href or empty title).
    pub fn work_item(&self) -> Option<WorkItem> {
        let link = self.link.as_ref()?;
        if link.href.trim().is_empty() || link.title.is_empty() {
            return None;
        }
        Some(WorkItem::new(link.href.clone(), self.handle))
    }
}

/// One unit of fetch work: a resource locator bound to the row that
/// receives the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    locator: String,
    row: RowHandle,
}

impl WorkItem {
    pub fn new(locator: impl Into<String>, row: RowHandle) -> Self {
        Self {
            locator: locator.into(),
            row,
        }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn row(&self) -> RowHandle {
        self.row
    }
}

/// FIFO queue of work items, consumed destructively by the scheduler.
pub type WorkQueue = VecDeque<WorkItem>;

/// Opaque HTML payload attached to a row by the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Fragment(pub String);

impl Fragment {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Why a fetch produced no fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentReason {
    /// The response had no matching fragment.
    NotFound,
    /// Transport or parse failure.
    Failed,
    /// The per-operation timeout fired before the fetch settled.
    TimedOut,
}

/// Outcome of one fetch. Failures are folded into [`FetchResult::Absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Applied(Fragment),
    Absent(AbsentReason),
}

impl FetchResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, FetchResult::Applied(_))
    }
}

/// Counts for one scheduler run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Items handed to the scheduler.
    pub queued: usize,
    pub dispatched: usize,
    /// Items skipped because their row already carried a result.
    pub skipped: usize,
    pub applied: usize,
    pub absent: usize,
    /// Highest number of simultaneously in-flight fetches observed.
    pub peak_in_flight: usize,
    /// Number of pacing delays taken between admission rounds.
    pub pacing_delays: usize,
}

impl RunSummary {
    pub fn settled(&self) -> usize {
        self.applied + self.absent
    }
}
