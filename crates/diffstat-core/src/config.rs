use std::time::Duration;

use crate::error::AppError;

/// Timing and retry budget for the readiness poller.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Settle time before the first attempt.
    pub initial_delay: Duration,
    /// Wait between two readiness checks.
    pub retry_interval: Duration,
    /// Maximum number of readiness checks.
    pub max_retries: u32,
    /// Elapsed-time budget, measured from the first attempt.
    pub max_wait_time: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(300),
            retry_interval: Duration::from_millis(500),
            max_retries: 20,
            max_wait_time: Duration::from_secs(10),
        }
    }
}

impl PollConfig {
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_max_wait_time(mut self, wait: Duration) -> Self {
        self.max_wait_time = wait;
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_retries == 0 {
            return Err(AppError::ConfigError(
                "max_retries must be at least 1".into(),
            ));
        }
        if self.max_wait_time.is_zero() {
            return Err(AppError::ConfigError(
                "max_wait_time must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Admission limits for the bounded scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of simultaneously in-flight fetches.
    pub max_concurrent: usize,
    /// Pacing delay between admission rounds while work remains.
    pub request_delay: Duration,
    /// Per-fetch deadline. `None` leaves a hung fetch holding its slot.
    pub fetch_timeout: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            request_delay: Duration::from_millis(200),
            fetch_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl SchedulerConfig {
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_concurrent == 0 {
            return Err(AppError::ConfigError(
                "max_concurrent must be at least 1".into(),
            ));
        }
        if self.fetch_timeout.is_some_and(|t| t.is_zero()) {
            return Err(AppError::ConfigError(
                "fetch_timeout must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }
}
