pub mod config;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod models;
pub mod poller;
pub mod report;
pub mod scheduler;
pub mod traits;

#[cfg(test)]
mod testutil;

pub use config::{PollConfig, SchedulerConfig};
pub use enrich::{CycleReport, EnrichService};
pub use error::AppError;
pub use models::{Fragment, Row, RowHandle, RowLink, RunSummary, WorkItem, WorkQueue};
pub use report::{Reporter, TracingReporter};
pub use traits::{Fetcher, FragmentExtractor, RowSink, RowSource};
