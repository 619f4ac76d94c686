use std::time::Duration;

use chrono::NaiveDateTime;
use rand::seq::IndexedRandom;
use serde::Serialize;
use shared::{
    domain::RunId,
    protocol::{ActiveStatus, RunStatistics},
};
use tracing::{info, warn};

use crate::{animation::AnimationMode, config::SyncConfig, error::PollError};

use super::view::ViewModel;

const ACTIVE_TITLE_ADVERBS: &[&str] = &[
    "with great enthusiasm",
    "vigorously",
    "with seemingly unlimited passion",
    "rather impetuously",
    "in an unreasoned manner",
    "like a furious Jerboa",
    "with passion",
    "ironically fast",
    "while occasionally sipping cheap red wine",
    "furiously, angrily even",
    "with white shores and green fields in mind",
    "and thinking of tomorrow",
    "platonically, whatever that means in this context",
    "with utmost haste",
    "whilst questioning the meaning of all this",
    "with a tad of melancholy",
];
const MAX_SUFFIX_DOTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Loading,
    Active,
    Sorted,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultReason {
    Connection,
    StalledWorker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub reason: FaultReason,
    pub detail: String,
}

impl Fault {
    pub fn message(&self) -> String {
        match self.reason {
            FaultReason::Connection => {
                format!("Connection trouble, retrying ({})", self.detail)
            }
            FaultReason::StalledWorker => {
                "The sorting worker has stopped making progress; still watching".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    PollActive,
    FetchFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub request: Request,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: Option<Schedule>,
    pub mode: Option<AnimationMode>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub speed: Option<f64>,
    pub total_iterations: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct RunDetails {
    start_date: Option<NaiveDateTime>,
    end_date: Option<NaiveDateTime>,
    sequence_length: usize,
    previous_url: Option<String>,
    next_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ControllerState {
    phase: Phase,
    fault: Option<Fault>,
    known_run_id: RunId,
    metrics: Metrics,
    details: RunDetails,
    poll_interval: Duration,
    base_backoff: Duration,
    max_backoff: Duration,
    retry_backoff: Duration,
    stall_threshold: u32,
    zero_speed_streak: u32,
    awaiting_statistics: bool,
    epoch: u64,
    torn_down: bool,
    title: String,
    title_suffix: String,
}

impl ControllerState {
    pub fn new(config: &SyncConfig) -> Self {
        let adverb = ACTIVE_TITLE_ADVERBS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or("vigorously");
        Self {
            phase: Phase::Loading,
            fault: None,
            known_run_id: config.run_id.clone(),
            metrics: Metrics::default(),
            details: RunDetails {
                start_date: config.start_date,
                sequence_length: config.sequence_length,
                ..RunDetails::default()
            },
            poll_interval: config.poll_interval,
            base_backoff: config.base_backoff,
            max_backoff: config.max_backoff,
            retry_backoff: config.base_backoff,
            stall_threshold: config.stall_threshold.max(1),
            zero_speed_streak: 0,
            awaiting_statistics: false,
            epoch: 0,
            torn_down: false,
            title: format!("Bogosorting {adverb}"),
            title_suffix: " ".to_string(),
        }
    }

    pub fn initial_request(&self) -> Schedule {
        Schedule {
            request: Request::PollActive,
            delay: Duration::ZERO,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn known_run_id(&self) -> &RunId {
        &self.known_run_id
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    pub fn sequence_length(&self) -> usize {
        self.details.sequence_length
    }

    pub fn is_awaiting_statistics(&self) -> bool {
        self.awaiting_statistics
    }

    pub fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Any phase change or teardown since `epoch` makes a response stale.
    pub fn is_relevant(&self, epoch: u64) -> bool {
        !self.torn_down && self.epoch == epoch
    }

    pub fn teardown(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;
        self.epoch += 1;
        true
    }

    pub fn apply_poll(&mut self, result: Result<ActiveStatus, PollError>) -> Transition {
        let status = match result {
            Ok(status) => status,
            Err(err) => return self.fail(&err, Request::PollActive),
        };

        if status.active_id != self.known_run_id || status.end_date.is_some() {
            info!(
                run_id = %self.known_run_id,
                active_id = %status.active_id,
                "sync: tracked run finished, fetching full statistics"
            );
            self.awaiting_statistics = true;
            if let Some(end_date) = status.end_date {
                self.details.end_date = Some(end_date);
            }
            return Transition {
                next: Some(Schedule {
                    request: Request::FetchFull,
                    delay: Duration::ZERO,
                }),
                mode: None,
            };
        }

        self.metrics = Metrics {
            speed: Some(status.current_speed),
            total_iterations: Some(status.total_iterations),
        };
        self.advance_suffix();

        // Zero readings only count once the run has been seen active.
        if status.current_speed == 0.0 && self.phase != Phase::Loading {
            self.zero_speed_streak = self.zero_speed_streak.saturating_add(1);
            if self.zero_speed_streak >= self.stall_threshold {
                return self.stall();
            }
        } else {
            self.zero_speed_streak = 0;
        }

        self.retry_backoff = self.base_backoff;
        self.fault = None;
        let mode = self.enter(Phase::Active).then_some(AnimationMode::Shuffling);
        Transition {
            next: Some(Schedule {
                request: Request::PollActive,
                delay: self.poll_interval,
            }),
            mode,
        }
    }

    pub fn apply_full(&mut self, result: Result<RunStatistics, PollError>) -> Transition {
        let stats = match result {
            Ok(stats) => stats,
            Err(err) => return self.fail(&err, Request::FetchFull),
        };

        self.details.start_date = Some(stats.start_date);
        self.details.end_date = stats.end_date.or(self.details.end_date);
        self.details.sequence_length = stats.sequence_length;
        self.details.previous_url = stats.previous_url;
        self.details.next_url = stats.next_url;
        self.metrics = Metrics {
            speed: None,
            total_iterations: Some(stats.total_iterations),
        };
        self.awaiting_statistics = false;
        self.fault = None;
        self.retry_backoff = self.base_backoff;
        self.enter(Phase::Sorted);
        info!(
            run_id = %self.known_run_id,
            total_iterations = stats.total_iterations,
            "sync: run sorted"
        );
        Transition {
            next: None,
            mode: Some(AnimationMode::Settled),
        }
    }

    pub fn view_model(&self) -> ViewModel {
        let (title, title_suffix) = match self.phase {
            Phase::Loading => ("Loading...".to_string(), String::new()),
            Phase::Sorted => ("Sorted".to_string(), String::new()),
            Phase::Active | Phase::Error => (self.title.clone(), self.title_suffix.clone()),
        };
        let speed_label = match (self.phase, self.metrics.speed) {
            (Phase::Sorted, _) => "-".to_string(),
            (_, Some(speed)) => format!("{} shuffles per second", speed.round() as u64),
            (_, None) => "Loading...".to_string(),
        };
        ViewModel {
            phase: self.phase,
            title,
            title_suffix,
            speed_label,
            total_iterations: self.metrics.total_iterations,
            sequence_length: self.details.sequence_length,
            start_date: self.details.start_date,
            end_date: self.details.end_date,
            previous_url: self.details.previous_url.clone(),
            next_url: self.details.next_url.clone(),
            error_message: self.fault.as_ref().map(Fault::message),
        }
    }

    fn fail(&mut self, err: &PollError, retry: Request) -> Transition {
        self.retry_backoff = self.grown_backoff();
        warn!(
            run_id = %self.known_run_id,
            kind = ?err.kind(),
            backoff_ms = self.retry_backoff.as_millis() as u64,
            "sync: request failed: {err}"
        );
        self.fault = Some(Fault {
            reason: FaultReason::Connection,
            detail: err.to_string(),
        });
        let mode = self.enter(Phase::Error).then_some(AnimationMode::Settled);
        Transition {
            next: Some(Schedule {
                request: retry,
                delay: self.retry_backoff,
            }),
            mode,
        }
    }

    fn stall(&mut self) -> Transition {
        let already_stalled = matches!(
            self.fault,
            Some(Fault {
                reason: FaultReason::StalledWorker,
                ..
            })
        );
        // First detection is a content signal, not a transport failure.
        self.retry_backoff = if already_stalled {
            self.grown_backoff()
        } else {
            self.base_backoff
        };
        if !already_stalled {
            warn!(
                run_id = %self.known_run_id,
                zero_readings = self.zero_speed_streak,
                "sync: worker reports zero speed while active"
            );
        }
        self.fault = Some(Fault {
            reason: FaultReason::StalledWorker,
            detail: format!("{} consecutive zero-speed readings", self.zero_speed_streak),
        });
        let mode = self.enter(Phase::Error).then_some(AnimationMode::Settled);
        Transition {
            next: Some(Schedule {
                request: Request::PollActive,
                delay: self.retry_backoff,
            }),
            mode,
        }
    }

    fn grown_backoff(&self) -> Duration {
        self.retry_backoff.saturating_mul(2).min(self.max_backoff)
    }

    fn enter(&mut self, phase: Phase) -> bool {
        if self.phase == phase {
            return false;
        }
        info!(
            run_id = %self.known_run_id,
            from = ?self.phase,
            to = ?phase,
            "sync: phase changed"
        );
        self.phase = phase;
        self.epoch += 1;
        true
    }

    fn advance_suffix(&mut self) {
        if self.title_suffix.trim().len() < MAX_SUFFIX_DOTS {
            self.title_suffix = format!("{}.", self.title_suffix.trim());
        } else {
            self.title_suffix = " ".to_string();
        }
    }
}

#[cfg(test)]
#[path = "../tests/state_tests.rs"]
mod tests;
