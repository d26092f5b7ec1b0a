//! Stale-hold sweeper
//!
//! Releases inventory holds and invitation redemptions left `Held` by
//! admissions whose compensation never completed (crash, exhausted retries).

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::invitation::InvitationRedeemer;
use super::ledger::InventoryLedger;

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub holds_released: usize,
    pub redemptions_released: usize,
}

/// Run one sweep over records older than the configured stale age
pub async fn sweep_once(ctx: &ServiceContext) -> ServiceResult<SweepReport> {
    let age = chrono::Duration::from_std(ctx.admission().stale_hold_age())
        .map_err(|e| ServiceError::internal(format!("stale hold age out of range: {e}")))?;
    let older_than = Utc::now() - age;

    Ok(SweepReport {
        holds_released: InventoryLedger::new(ctx).sweep_stale(older_than).await?,
        redemptions_released: InvitationRedeemer::new(ctx).sweep_stale(older_than).await?,
    })
}

/// Handle to a running sweeper task
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the loop and wait for the current sweep to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Sweeper task failed");
        }
    }
}

/// Spawn the periodic sweep loop
pub fn spawn_sweeper(ctx: ServiceContext) -> SweeperHandle {
    let (shutdown, mut stop) = watch::channel(false);
    let period = ctx.admission().sweep_interval();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_secs = period.as_secs(), "Stale-hold sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match sweep_once(&ctx).await {
                        Ok(report) => debug!(?report, "Sweep finished"),
                        Err(e) => error!(error = %e, "Sweep failed"),
                    }
                }
                _ = stop.changed() => break,
            }
        }

        info!("Stale-hold sweeper stopped");
    });

    SweeperHandle { shutdown, task }
}
