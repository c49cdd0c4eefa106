use serde::Serialize;

use crate::config::{PollConfig, SchedulerConfig};
use crate::error::AppError;
use crate::models::{Row, RunSummary, WorkQueue};
use crate::poller::{Readiness, ReadinessPoller};
use crate::report::{EnrichEvent, Reporter};
use crate::scheduler::BoundedScheduler;
use crate::traits::{Fetcher, FragmentExtractor, RowSink, RowSource};

/// Outcome of one enrichment cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleReport {
    Ready {
        attempts: u32,
        rows: usize,
        malformed: usize,
        /// Rows that already carried a diffstat when the queue was built.
        already_enriched: usize,
        /// `None` when every row was malformed or already enriched.
        summary: Option<RunSummary>,
    },
    ExhaustedRetries {
        attempts: u32,
    },
    ExhaustedTime {
        attempts: u32,
        elapsed_ms: u64,
    },
}

impl CycleReport {
    pub fn is_ready(&self) -> bool {
        matches!(self, CycleReport::Ready { .. })
    }
}

/// Orchestrates one page-load cycle: settle → wait for rows → present rows →
/// build the work queue → drain it through the bounded scheduler.
///
/// Generic over all collaborators via traits, so the whole cycle runs
/// against mocks in tests.
pub struct EnrichService<R, F, X, S>
where
    R: RowSource,
    F: Fetcher,
    X: FragmentExtractor,
    S: RowSink,
{
    poller: ReadinessPoller<R>,
    scheduler: BoundedScheduler<F, X, S>,
    sink: S,
}

impl<R, F, X, S> EnrichService<R, F, X, S>
where
    R: RowSource,
    F: Fetcher,
    X: FragmentExtractor,
    S: RowSink,
{
    pub fn new(
        source: R,
        fetcher: F,
        extractor: X,
        sink: S,
        poll_config: PollConfig,
        scheduler_config: SchedulerConfig,
    ) -> Result<Self, AppError> {
        poll_config.validate()?;

        Ok(Self {
            poller: ReadinessPoller::new(source, poll_config),
            scheduler: BoundedScheduler::new(fetcher, extractor, sink.clone(), scheduler_config)?,
            sink,
        })
    }

    /// Run a full cycle, starting with the configured initial delay.
    pub async fn run_cycle<RP: Reporter>(&self, reporter: &RP) -> CycleReport {
        tokio::time::sleep(self.poller.config().initial_delay).await;

        match self.poller.poll(reporter).await {
            Readiness::Ready { rows, attempts } => {
                let (queue, malformed) = self.prepare(&rows, reporter);
                let already_enriched = rows.len() - malformed - queue.len();

                let summary = if queue.is_empty() {
                    None
                } else {
                    Some(self.scheduler.run(queue, reporter).await)
                };

                CycleReport::Ready {
                    attempts,
                    rows: rows.len(),
                    malformed,
                    already_enriched,
                    summary,
                }
            }
            Readiness::ExhaustedRetries { attempts } => CycleReport::ExhaustedRetries { attempts },
            Readiness::ExhaustedTime { elapsed, attempts } => CycleReport::ExhaustedTime {
                attempts,
                elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            },
        }
    }

    /// Apply presentation to every row and collect work for the rows that
    /// are well formed and not yet enriched. Returns the queue and the
    /// number of malformed rows.
    pub fn prepare<RP: Reporter>(&self, rows: &[Row], reporter: &RP) -> (WorkQueue, usize) {
        let mut queue = WorkQueue::with_capacity(rows.len());
        let mut malformed = 0;

        for row in rows {
            self.sink.apply_presentation(row);

            let Some(item) = row.work_item() else {
                malformed += 1;
                reporter.report(EnrichEvent::RowMalformed { row: row.handle });
                continue;
            };

            if !self.sink.has_existing_result(row.handle) {
                queue.push_back(item);
            }
        }

        (queue, malformed)
    }
}
