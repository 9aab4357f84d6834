//! Proactive token refresh.
//!
//! DESIGN
//! ======
//! One background task per session bridge, with three phases:
//! - `Idle`: nobody is signed in; the task waits for an authenticated state
//! - `Scheduled`: a fixed-period timer is armed
//! - `Refreshing`: a tick is forcing a token refresh through the bridge
//!
//! The tick awaits the refresh inline, so ticks never overlap, and the bridge
//! serialises forced refreshes anyway (interceptor-driven refreshes included).
//! Leaving the authenticated state drops the timer. Dropping the returned
//! [`RefreshHandle`] aborts the task.
//!
//! ERROR HANDLING
//! ==============
//! A failed scheduled refresh is logged and the timer stays armed. Expiring
//! the session is left to the request layer, which sees the 401.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::bridge::SessionBridge;
use crate::types::SessionState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Scheduled,
    Refreshing,
}

/// Owner of the refresh task. Dropping it cancels the timer.
pub struct RefreshHandle {
    phase: watch::Receiver<RefreshPhase>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    #[must_use]
    pub fn phase(&self) -> RefreshPhase {
        *self.phase.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RefreshPhase> {
        self.phase.clone()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn the refresh task for `bridge`, ticking every `interval`.
pub fn spawn_refresh_scheduler(bridge: Arc<SessionBridge>, interval: Duration) -> RefreshHandle {
    let (phase_tx, phase_rx) = watch::channel(RefreshPhase::Idle);
    let mut states = bridge.subscribe();
    let interval_secs = interval.as_secs();

    let task = tokio::spawn(async move {
        loop {
            phase_tx.send_replace(RefreshPhase::Idle);
            if states.wait_for(SessionState::is_authenticated).await.is_err() {
                break;
            }

            phase_tx.send_replace(RefreshPhase::Scheduled);
            info!(interval_secs, "token refresh scheduled");
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !states.borrow().is_authenticated() {
                            break;
                        }
                        phase_tx.send_replace(RefreshPhase::Refreshing);
                        match bridge.force_refresh().await {
                            Ok(_) => debug!("scheduled token refresh done"),
                            Err(e) => warn!(error = %e, "scheduled token refresh failed"),
                        }
                        phase_tx.send_replace(RefreshPhase::Scheduled);
                    }
                    changed = states.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        if !states.borrow_and_update().is_authenticated() {
                            info!("token refresh cancelled");
                            break;
                        }
                    }
                }
            }
        }
        debug!("session publisher closed; refresh task exiting");
    });

    RefreshHandle { phase: phase_rx, task }
}

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;
