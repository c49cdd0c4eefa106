use std::time::Duration;

use crate::models::{AbsentReason, RowHandle, RunSummary};

/// Events emitted by the poller and scheduler for monitoring/logging.
#[derive(Debug, Clone)]
pub enum EnrichEvent<'a> {
    PollAttempt {
        attempt: u32,
    },
    RowsNotReady {
        attempt: u32,
        retry_in: Duration,
    },
    RetriesExhausted {
        attempts: u32,
    },
    WaitExhausted {
        elapsed: Duration,
    },
    RowsReady {
        rows: usize,
        attempt: u32,
    },
    RowMalformed {
        row: RowHandle,
    },
    Dispatched {
        locator: &'a str,
        in_flight: usize,
    },
    AlreadyEnriched {
        locator: &'a str,
    },
    Applied {
        locator: &'a str,
    },
    Absent {
        locator: &'a str,
        reason: AbsentReason,
    },
    Pacing {
        delay: Duration,
        remaining: usize,
    },
    Drained {
        summary: &'a RunSummary,
    },
}

/// Trait for receiving enrichment events (decoupled logging).
pub trait Reporter: Send + Sync {
    fn report(&self, event: EnrichEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: EnrichEvent<'_>) {
        match event {
            EnrichEvent::PollAttempt { attempt } => {
                tracing::debug!(%attempt, "Checking for rows");
            }
            EnrichEvent::RowsNotReady { attempt, retry_in } => {
                tracing::debug!(%attempt, retry_in_ms = %retry_in.as_millis(), "No rows yet");
            }
            EnrichEvent::RetriesExhausted { attempts } => {
                tracing::warn!(%attempts, "Max polling retries reached, rows may not be loaded");
            }
            EnrichEvent::WaitExhausted { elapsed } => {
                tracing::warn!(elapsed_ms = %elapsed.as_millis(), "Polling timed out");
            }
            EnrichEvent::RowsReady { rows, attempt } => {
                tracing::info!(%rows, %attempt, "Rows ready");
            }
            EnrichEvent::RowMalformed { row } => {
                tracing::info!(%row, "Link not found or incomplete, row skipped");
            }
            EnrichEvent::Dispatched { locator, in_flight } => {
                tracing::debug!(%locator, %in_flight, "Fetching diffstat");
            }
            EnrichEvent::AlreadyEnriched { locator } => {
                tracing::debug!(%locator, "Diffstat already present, skipped");
            }
            EnrichEvent::Applied { locator } => {
                tracing::debug!(%locator, "Diffstat applied");
            }
            EnrichEvent::Absent { locator, reason } => {
                tracing::debug!(%locator, ?reason, "No diffstat");
            }
            EnrichEvent::Pacing { delay, remaining } => {
                tracing::trace!(delay_ms = %delay.as_millis(), %remaining, "Pacing before next round");
            }
            EnrichEvent::Drained { summary } => {
                tracing::info!(
                    dispatched = %summary.dispatched,
                    applied = %summary.applied,
                    absent = %summary.absent,
                    skipped = %summary.skipped,
                    "Diffstat queue drained"
                );
            }
        }
    }
}
