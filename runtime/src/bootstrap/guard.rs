// Copyright 2026 The Travelers Contributors
// SPDX-License-Identifier: Apache-2.0

//! Init guard — at most one SDK bootstrap per shared guard.
//!
//! The first caller to find the guard `Idle` flips it to `Loading` and starts
//! the loader on a detached task, so the bootstrap finishes even if the view
//! that started it goes away. Every other caller waits for the guard to
//! settle, either on the watch channel (one-shot notification) or by
//! re-checking the state on a fixed interval.

use super::TeardownSignal;
use crate::error::LoadError;
use crate::sdk::{LoaderOptions, MapsSdk, SdkLoader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Interval of the polling wait strategy.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Bootstrap lifecycle.
#[derive(Clone)]
pub enum BootstrapState {
    Idle,
    Loading,
    Ready(Arc<dyn MapsSdk>),
    /// Sticky until [`InitGuard::reset`].
    Failed(LoadError),
}

impl BootstrapState {
    pub fn is_settled(&self) -> bool {
        matches!(self, BootstrapState::Ready(_) | BootstrapState::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            BootstrapState::Idle => "idle",
            BootstrapState::Loading => "loading",
            BootstrapState::Ready(_) => "ready",
            BootstrapState::Failed(_) => "failed",
        }
    }
}

impl fmt::Debug for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapState::Failed(e) => write!(f, "Failed({e})"),
            other => f.write_str(other.label()),
        }
    }
}

/// How a caller that finds a bootstrap in flight waits for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ReadinessWait {
    /// Wake on the state transition.
    Notify,
    /// Re-check the state every `interval_ms`, with no overall timeout.
    Poll { interval_ms: u64 },
}

impl Default for ReadinessWait {
    fn default() -> Self {
        ReadinessWait::Notify
    }
}

/// Everything needed to run the loader, should this caller be the first.
#[derive(Clone)]
pub struct BootstrapRequest {
    pub loader: Arc<dyn SdkLoader>,
    pub api_key: String,
    pub options: LoaderOptions,
}

/// Shared bootstrap coordinator.
pub struct InitGuard {
    state: watch::Sender<BootstrapState>,
    loads: AtomicUsize,
    polls: AtomicUsize,
}

impl InitGuard {
    pub fn new() -> Self {
        let (state, _rx) = watch::channel(BootstrapState::Idle);
        Self {
            state,
            loads: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Current state snapshot.
    pub fn state(&self) -> BootstrapState {
        self.state.borrow().clone()
    }

    /// Number of loader invocations started by this guard.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of readiness checks made by polling waiters.
    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Return a failed guard to `Idle` so the next caller bootstraps again.
    /// Returns whether the guard was reset.
    pub fn reset(&self) -> bool {
        let reset = self.state.send_if_modified(|state| {
            if matches!(state, BootstrapState::Failed(_)) {
                *state = BootstrapState::Idle;
                true
            } else {
                false
            }
        });
        if reset {
            info!("maps bootstrap reset for reload");
        }
        reset
    }

    /// Obtain the loaded SDK, starting the bootstrap if nobody has.
    ///
    /// Returns [`LoadError::Unmounted`] if `teardown` fires before the guard
    /// settles; the bootstrap itself keeps running for other callers.
    pub async fn acquire(
        self: &Arc<Self>,
        request: BootstrapRequest,
        wait: ReadinessWait,
        teardown: &TeardownSignal,
    ) -> Result<Arc<dyn MapsSdk>, LoadError> {
        if teardown.is_triggered() {
            return Err(LoadError::Unmounted);
        }

        // Check-and-set under the channel's write lock: no suspension between
        // observing Idle and publishing Loading.
        let started = self.state.send_if_modified(|state| {
            if matches!(state, BootstrapState::Idle) {
                *state = BootstrapState::Loading;
                true
            } else {
                false
            }
        });

        if started {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.spawn_load(request);
        } else {
            debug!("maps bootstrap already {}", self.state.borrow().label());
        }

        match wait {
            ReadinessWait::Notify => self.wait_notified(teardown).await,
            ReadinessWait::Poll { interval_ms } => {
                self.wait_polling(Duration::from_millis(interval_ms.max(1)), teardown)
                    .await
            }
        }
    }

    fn spawn_load(self: &Arc<Self>, request: BootstrapRequest) {
        let guard = Arc::clone(self);
        info!("bootstrapping maps SDK (version {})", request.options.version);

        tokio::spawn(async move {
            let BootstrapRequest {
                loader,
                api_key,
                options,
            } = request;
            let load = tokio::spawn(async move { loader.load(&api_key, &options).await });
            let outcome = load
                .await
                .unwrap_or_else(|e| Err(LoadError::Sdk(format!("loader task failed: {e}"))));
            guard.finish(outcome);
        });
    }

    fn finish(&self, outcome: Result<Arc<dyn MapsSdk>, LoadError>) {
        let next = match outcome {
            Ok(sdk) => {
                info!("maps SDK loaded");
                BootstrapState::Ready(sdk)
            }
            Err(e) => {
                warn!("maps SDK failed to load: {e}");
                BootstrapState::Failed(e)
            }
        };
        self.state.send_replace(next);
    }

    async fn wait_notified(&self, teardown: &TeardownSignal) -> Result<Arc<dyn MapsSdk>, LoadError> {
        let mut rx = self.state.subscribe();
        let settled = async move {
            rx.wait_for(BootstrapState::is_settled)
                .await
                .map(|state| BootstrapState::clone(&state))
        };

        tokio::select! {
            biased;
            _ = teardown.cancelled() => Err(LoadError::Unmounted),
            state = settled => match state {
                Ok(BootstrapState::Ready(sdk)) => Ok(sdk),
                Ok(BootstrapState::Failed(e)) => Err(e),
                _ => Err(LoadError::Sdk("bootstrap abandoned".to_string())),
            },
        }
    }

    async fn wait_polling(
        &self,
        interval: Duration,
        teardown: &TeardownSignal,
    ) -> Result<Arc<dyn MapsSdk>, LoadError> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = teardown.cancelled() => return Err(LoadError::Unmounted),
                _ = ticker.tick() => {}
            }

            self.polls.fetch_add(1, Ordering::SeqCst);
            match self.state() {
                BootstrapState::Ready(sdk) => return Ok(sdk),
                BootstrapState::Failed(e) => return Err(e),
                BootstrapState::Idle | BootstrapState::Loading => {}
            }
        }
    }
}

impl Default for InitGuard {
    fn default() -> Self {
        Self::new()
    }
}
