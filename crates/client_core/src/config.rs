use std::time::Duration;

use chrono::NaiveDateTime;
use shared::{domain::RunId, protocol::RunStatistics};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_STALL_THRESHOLD: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub active_status: Url,
    pub full_status: Url,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub spacing: f32,
    pub y_padding: f32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            spacing: 1.1,
            y_padding: 60.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub endpoints: Endpoints,
    pub run_id: RunId,
    pub sequence_length: usize,
    pub start_date: Option<NaiveDateTime>,
    pub poll_interval: Duration,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub request_timeout: Duration,
    /// Consecutive zero-speed readings before the worker counts as stalled.
    pub stall_threshold: u32,
    pub layout: Layout,
}

impl SyncConfig {
    pub fn new(endpoints: Endpoints, run_id: impl Into<RunId>, sequence_length: usize) -> Self {
        Self {
            endpoints,
            run_id: run_id.into(),
            sequence_length,
            start_date: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            base_backoff: DEFAULT_BASE_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            stall_threshold: DEFAULT_STALL_THRESHOLD,
            layout: Layout::default(),
        }
    }

    pub fn with_start_date(mut self, start_date: NaiveDateTime) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_backoff = base;
        self.max_backoff = max;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_stall_threshold(mut self, stall_threshold: u32) -> Self {
        self.stall_threshold = stall_threshold;
        self
    }

    pub fn with_statistics(mut self, stats: &RunStatistics) -> Self {
        self.sequence_length = stats.sequence_length;
        self.start_date = Some(stats.start_date);
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sequence_length == 0 {
            return Err(ConfigError::EmptySequence);
        }
        for (field, value) in [
            ("poll_interval", self.poll_interval),
            ("base_backoff", self.base_backoff),
            ("request_timeout", self.request_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration { field });
            }
        }
        if self.max_backoff < self.base_backoff {
            return Err(ConfigError::BackoffBounds {
                base_ms: self.base_backoff.as_millis(),
                max_ms: self.max_backoff.as_millis(),
            });
        }
        if self.stall_threshold == 0 {
            return Err(ConfigError::ZeroStallThreshold);
        }
        if !self.layout.spacing.is_finite() || self.layout.spacing <= 0.0 {
            return Err(ConfigError::InvalidSpacing);
        }
        Ok(())
    }
}
