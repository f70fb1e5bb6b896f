// src/session/ticker.rs

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::registry::{self, SessionHandle, SessionMap, TickOutcome};

/// Spawns the expiry observer for `handle` unless one is already running.
///
/// Each tick recomputes the remaining time from the wall clock, so delayed
/// or skipped ticks only delay the auto-submit, never shift the deadline.
/// Once the session finishes, the handle is released from `sessions`.
pub fn spawn(
    handle: SessionHandle,
    period: Duration,
    sessions: SessionMap,
) -> Option<JoinHandle<()>> {
    if !handle.claim_observer() {
        return None;
    }

    tracing::debug!("Starting expiry observer for exam {}", handle.exam_id());

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            match handle.tick().await {
                TickOutcome::Running { remaining_seconds } => {
                    tracing::trace!(
                        "Exam {}: {}s remaining",
                        handle.exam_id(),
                        remaining_seconds
                    );
                }
                TickOutcome::Finished => break,
            }
        }

        registry::evict(&sessions, &handle).await;
        tracing::debug!("Expiry observer for exam {} stopped", handle.exam_id());
    }))
}
