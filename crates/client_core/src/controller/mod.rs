pub mod state;
pub mod view;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    animation::{AnimationEngine, AnimationHandle},
    config::SyncConfig,
    polling::StatusSource,
};

pub use state::{
    ControllerState, Fault, FaultReason, Metrics, Phase, Request, Schedule, Transition,
};
pub use view::ViewModel;

struct Shared {
    state: Mutex<ControllerState>,
    source: Arc<dyn StatusSource>,
    animation: AnimationHandle,
    view: watch::Sender<ViewModel>,
    shutdown: watch::Sender<bool>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn issue(&self) -> Option<u64> {
        let state = self.state();
        (!state.is_torn_down()).then(|| state.epoch())
    }

    fn apply(
        &self,
        epoch: u64,
        request: Request,
        update: impl FnOnce(&mut ControllerState) -> Transition,
    ) -> Option<Option<Schedule>> {
        let mut state = self.state();
        if !state.is_relevant(epoch) {
            debug!(
                run_id = %state.known_run_id(),
                ?request,
                issued_epoch = epoch,
                current_epoch = state.epoch(),
                "sync: discarding stale response"
            );
            return None;
        }
        let transition = update(&mut state);
        let reported = state.sequence_length();
        let animated = self.animation.sequence_length();
        if reported != animated {
            warn!(
                run_id = %state.known_run_id(),
                animated,
                reported,
                "sync: backend sequence length differs from animation, resizing bars"
            );
            self.animation.set_sequence_length(reported);
        }
        if let Some(mode) = transition.mode {
            self.animation.set_mode(mode);
        }
        self.view.send_replace(state.view_model());
        Some(transition.next)
    }
}

pub struct SyncController {
    shared: Arc<Shared>,
    driver: JoinHandle<()>,
}

impl SyncController {
    pub fn start(
        config: &SyncConfig,
        source: Arc<dyn StatusSource>,
        animation: AnimationHandle,
    ) -> Self {
        let state = ControllerState::new(config);
        let first = state.initial_request();
        let (view, _) = watch::channel(state.view_model());
        let (shutdown, shutdown_rx) = watch::channel(false);
        info!(run_id = %config.run_id, "sync: attaching to run");

        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            source,
            animation,
            view,
            shutdown,
        });
        let driver = tokio::spawn(drive(Arc::clone(&shared), first, shutdown_rx));
        Self { shared, driver }
    }

    pub fn start_with_engine(config: &SyncConfig, source: Arc<dyn StatusSource>) -> Self {
        let animation = AnimationHandle::new(AnimationEngine::new(
            config.sequence_length,
            config.layout,
        ));
        Self::start(config, source, animation)
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewModel> {
        self.shared.view.subscribe()
    }

    pub fn view_model(&self) -> ViewModel {
        self.shared.view.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.shared.state().phase()
    }

    pub fn metrics(&self) -> Metrics {
        self.shared.state().metrics()
    }

    pub fn animation(&self) -> &AnimationHandle {
        &self.shared.animation
    }

    pub fn is_finished(&self) -> bool {
        self.driver.is_finished()
    }

    /// Idempotent. In-flight requests finish but their results are discarded.
    pub fn teardown(&self) {
        let first = self.shared.state().teardown();
        self.shared.shutdown.send_replace(true);
        self.shared.animation.stop();
        if first {
            info!("sync: torn down");
        }
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn drive(shared: Arc<Shared>, first: Schedule, mut shutdown: watch::Receiver<bool>) {
    let mut next = Some(first);
    while let Some(Schedule { request, delay }) = next.take() {
        if !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    debug!("sync: timer cancelled");
                    return;
                }
            }
        }
        if *shutdown.borrow() {
            return;
        }
        let Some(epoch) = shared.issue() else {
            return;
        };

        let outcome = match request {
            Request::PollActive => {
                let result = shared.source.poll_active().await;
                shared.apply(epoch, request, |state| state.apply_poll(result))
            }
            Request::FetchFull => {
                let result = shared.source.fetch_full().await;
                shared.apply(epoch, request, |state| state.apply_full(result))
            }
        };
        match outcome {
            Some(schedule) => next = schedule,
            None => return,
        }
    }
    debug!("sync: polling finished");
}

#[cfg(test)]
#[path = "../tests/controller_tests.rs"]
mod tests;
