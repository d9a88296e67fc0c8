//! Idle detection.
//!
//! A background task periodically checks every session. The check itself is
//! idempotent, so overlapping scans or restarts cannot double-warn or
//! double-pause.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::context::SessionContext;
use crate::domain::aggregates::IdleCheck;
use crate::error::SessionError;

/// Counts from one pass over all sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdleScanReport {
    /// Sessions looked at.
    pub scanned: usize,
    /// Sessions that got their warning.
    pub warned: usize,
    /// Sessions paused for inactivity.
    pub paused: usize,
    /// Sessions whose check failed.
    pub failed: usize,
}

/// Runs the idle check on one session and writes the result.
///
/// # Errors
///
/// `NotFound`, or a storage failure.
pub async fn check_session_idle(
    session_id: Uuid,
    ctx: &SessionContext,
) -> Result<IdleCheck, SessionError> {
    let correlation_id = Uuid::new_v4();
    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(session_id, |session| {
            Ok(session.check_idle(correlation_id, clock))
        })
        .await?;
    match mutation.output {
        IdleCheck::Paused => info!(session_id = %session_id, "session paused for inactivity"),
        IdleCheck::Warned => info!(session_id = %session_id, "idle warning raised"),
        IdleCheck::Unchanged => {}
    }
    Ok(mutation.output)
}

/// Checks every stored session once.
///
/// # Errors
///
/// Only when the session list itself cannot be read; per-session failures
/// are counted and logged.
pub async fn scan_idle_sessions(ctx: &SessionContext) -> Result<IdleScanReport, SessionError> {
    let mut report = IdleScanReport::default();
    for session_id in ctx.sessions.list_ids().await? {
        report.scanned += 1;
        match check_session_idle(session_id, ctx).await {
            Ok(IdleCheck::Warned) => report.warned += 1,
            Ok(IdleCheck::Paused) => report.paused += 1,
            Ok(IdleCheck::Unchanged) | Err(SessionError::NotFound(_)) => {}
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "idle check failed");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

/// Spawns the periodic idle scanner. It stops when `shutdown` flips to
/// `true` or its sender is dropped.
pub fn spawn_idle_scanner(
    ctx: SessionContext,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = every.as_secs(), "idle scanner started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match scan_idle_sessions(&ctx).await {
                        Ok(report) => debug!(
                            scanned = report.scanned,
                            warned = report.warned,
                            paused = report.paused,
                            failed = report.failed,
                            "idle scan finished"
                        ),
                        Err(e) => warn!(error = %e, "idle scan failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("idle scanner stopped");
    })
}
