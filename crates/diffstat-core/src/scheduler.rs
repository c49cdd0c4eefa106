//! Bounded-concurrency fetch scheduler.
//!
//! Admission is completion-driven: up to `max_concurrent` fetches are in
//! flight, the loop suspends until *any* of them settles, then refills.
//! While work remains queued a fixed pacing delay separates admission
//! rounds; the last round takes no trailing delay.
//!
//! ```text
//! ┌────────────┐  admit (FIFO, skip enriched)  ┌──────────────┐
//! │ WorkQueue  │ ────────────────────────────▶ │ in-flight    │ ≤ max_concurrent
//! └────────────┘                               │ (JoinSet)    │
//!       ▲                                      └──────┬───────┘
//!       │        pacing delay if queue non-empty      │ first settlement
//!       └─────────────────────────────────────────────┘ + drain settled
//! ```

use tokio::task::{JoinError, JoinSet};

use crate::config::SchedulerConfig;
use crate::error::AppError;
use crate::fetch::DiffstatFetcher;
use crate::models::{FetchResult, RunSummary, WorkItem, WorkQueue};
use crate::report::{EnrichEvent, Reporter};
use crate::traits::{Fetcher, FragmentExtractor, RowSink};

/// Drains a [`WorkQueue`] through a [`DiffstatFetcher`] with at most
/// `max_concurrent` fetches in flight.
///
/// The queue and the in-flight set are owned by one `run` call and only
/// touched between suspension points; fetch tasks share nothing but the
/// sink, and each of them writes to its own row.
pub struct BoundedScheduler<F, X, S> {
    fetcher: DiffstatFetcher<F, X>,
    sink: S,
    config: SchedulerConfig,
}

impl<F, X, S> BoundedScheduler<F, X, S>
where
    F: Fetcher,
    X: FragmentExtractor,
    S: RowSink,
{
    pub fn new(
        fetcher: F,
        extractor: X,
        sink: S,
        config: SchedulerConfig,
    ) -> Result<Self, AppError> {
        config.validate()?;
        let fetcher = DiffstatFetcher::new(fetcher, extractor).with_timeout(config.fetch_timeout);
        Ok(Self {
            fetcher,
            sink,
            config,
        })
    }

    /// Run the queue to completion. Returns once the queue and the
    /// in-flight set are both empty.
    pub async fn run<R: Reporter>(&self, mut queue: WorkQueue, reporter: &R) -> RunSummary {
        let mut summary = RunSummary {
            queued: queue.len(),
            ..RunSummary::default()
        };
        let mut in_flight: JoinSet<(WorkItem, FetchResult)> = JoinSet::new();

        while !queue.is_empty() || !in_flight.is_empty() {
            // Fetches that settled during the pacing delay free their slots
            // before admission.
            while let Some(settled) = in_flight.try_join_next() {
                record(settled, &mut summary, reporter);
            }
            self.admit(&mut queue, &mut in_flight, &mut summary, reporter);

            if let Some(settled) = in_flight.join_next().await {
                record(settled, &mut summary, reporter);
                // Everything else that already settled frees its slot now,
                // not one round at a time.
                while let Some(settled) = in_flight.try_join_next() {
                    record(settled, &mut summary, reporter);
                }
            }

            if !queue.is_empty() {
                summary.pacing_delays += 1;
                reporter.report(EnrichEvent::Pacing {
                    delay: self.config.request_delay,
                    remaining: queue.len(),
                });
                tokio::time::sleep(self.config.request_delay).await;
            }
        }

        reporter.report(EnrichEvent::Drained { summary: &summary });
        summary
    }

    /// Move items from the queue into the in-flight set until it is full
    /// or the queue is empty. Rows that already carry a result are dropped
    /// without consuming a slot.
    fn admit<R: Reporter>(
        &self,
        queue: &mut WorkQueue,
        in_flight: &mut JoinSet<(WorkItem, FetchResult)>,
        summary: &mut RunSummary,
        reporter: &R,
    ) {
        while in_flight.len() < self.config.max_concurrent {
            let Some(item) = queue.pop_front() else {
                break;
            };

            if self.sink.has_existing_result(item.row()) {
                summary.skipped += 1;
                reporter.report(EnrichEvent::AlreadyEnriched {
                    locator: item.locator(),
                });
                continue;
            }

            reporter.report(EnrichEvent::Dispatched {
                locator: item.locator(),
                in_flight: in_flight.len() + 1,
            });

            let fetcher = self.fetcher.clone();
            let sink = self.sink.clone();
            in_flight.spawn(async move {
                let result = fetcher.fetch(&item, &sink).await;
                (item, result)
            });

            summary.dispatched += 1;
            summary.peak_in_flight = summary.peak_in_flight.max(in_flight.len());
        }
    }
}

fn record<R: Reporter>(
    settled: Result<(WorkItem, FetchResult), JoinError>,
    summary: &mut RunSummary,
    reporter: &R,
) {
    match settled {
        Ok((item, FetchResult::Applied(_))) => {
            summary.applied += 1;
            reporter.report(EnrichEvent::Applied {
                locator: item.locator(),
            });
        }
        Ok((item, FetchResult::Absent(reason))) => {
            summary.absent += 1;
            reporter.report(EnrichEvent::Absent {
                locator: item.locator(),
                reason,
            });
        }
        Err(e) => {
            // A panicked fetch task still settles and frees its slot.
            summary.absent += 1;
            tracing::error!(error = %e, "Diffstat fetch task failed");
        }
    }
}
