//! Readiness poller: waits for asynchronously rendered rows to exist.
//!
//! Each attempt is a step over an explicit [`PollState`]. A step either
//! reaches a terminal [`Readiness`] or yields the state for the next attempt,
//! which [`ReadinessPoller::poll`] resumes after `retry_interval`.
//!
//! ```text
//! Waiting ──[no rows]──▶ Waiting
//!    │ ├──[retry_count ≥ max_retries]──▶ ExhaustedRetries
//!    │ └──[elapsed ≥ max_wait_time]────▶ ExhaustedTime
//!    └──[rows present]──▶ Ready
//! ```

use std::time::Duration;

use tokio::time::Instant;

use crate::config::PollConfig;
use crate::models::Row;
use crate::report::{EnrichEvent, Reporter};
use crate::traits::RowSource;

/// State threaded through successive readiness attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
    pub retry_count: u32,
    pub start_time: Instant,
}

impl PollState {
    pub fn start(now: Instant) -> Self {
        Self {
            retry_count: 0,
            start_time: now,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start_time)
    }

    /// State for the following attempt: one more retry, same start time.
    pub fn next(self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self
        }
    }
}

/// Terminal outcome of one readiness cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready { rows: Vec<Row>, attempts: u32 },
    ExhaustedRetries { attempts: u32 },
    ExhaustedTime { elapsed: Duration, attempts: u32 },
}

/// Result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep {
    Done(Readiness),
    Retry(PollState),
}

/// Asks a [`RowSource`] for rows until some appear or the budget runs out.
pub struct ReadinessPoller<R> {
    source: R,
    config: PollConfig,
}

impl<R: RowSource> ReadinessPoller<R> {
    pub fn new(source: R, config: PollConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Check the retry budget, then the time budget.
    pub fn exhausted(&self, state: &PollState, now: Instant) -> Option<Readiness> {
        if state.retry_count >= self.config.max_retries {
            return Some(Readiness::ExhaustedRetries {
                attempts: state.retry_count,
            });
        }
        let elapsed = state.elapsed(now);
        if elapsed >= self.config.max_wait_time {
            return Some(Readiness::ExhaustedTime {
                elapsed,
                attempts: state.retry_count,
            });
        }
        None
    }

    /// Run one attempt against the row source.
    pub async fn attempt<RP: Reporter>(&self, state: PollState, reporter: &RP) -> PollStep {
        if let Some(done) = self.exhausted(&state, Instant::now()) {
            match &done {
                Readiness::ExhaustedRetries { attempts } => {
                    reporter.report(EnrichEvent::RetriesExhausted {
                        attempts: *attempts,
                    });
                }
                Readiness::ExhaustedTime { elapsed, .. } => {
                    reporter.report(EnrichEvent::WaitExhausted { elapsed: *elapsed });
                }
                Readiness::Ready { .. } => {}
            }
            return PollStep::Done(done);
        }

        let attempt = state.retry_count + 1;
        reporter.report(EnrichEvent::PollAttempt { attempt });

        let rows = self.source.list_rows().await;
        if rows.is_empty() {
            reporter.report(EnrichEvent::RowsNotReady {
                attempt,
                retry_in: self.config.retry_interval,
            });
            return PollStep::Retry(state.next());
        }

        reporter.report(EnrichEvent::RowsReady {
            rows: rows.len(),
            attempt,
        });
        PollStep::Done(Readiness::Ready {
            rows,
            attempts: attempt,
        })
    }

    /// Attempt until a terminal state is reached, suspending for
    /// `retry_interval` between attempts. The clock starts at the first
    /// attempt.
    pub async fn poll<RP: Reporter>(&self, reporter: &RP) -> Readiness {
        let mut state = PollState::start(Instant::now());
        loop {
            match self.attempt(state, reporter).await {
                PollStep::Done(readiness) => return readiness,
                PollStep::Retry(next) => {
                    tokio::time::sleep(self.config.retry_interval).await;
                    state = next;
                }
            }
        }
    }
}
