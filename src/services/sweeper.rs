//! Background expiry sweeper with an explicit start/stop lifecycle
//!
//! One owned tokio task ticks at a fixed interval and cancels PENDING loans
//! whose pickup window has passed. Single-flight is structural: the task
//! awaits each sweep before the next tick, and missed ticks are delayed
//! rather than stacked. Each sweep runs in one transaction with the same
//! row locking as foreground handlers.

use chrono::{Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{config::CirculationConfig, error::AppResult, repository::Repository};

pub struct ExpirySweeper {
    repository: Repository,
    config: CirculationConfig,
}

/// Handle to a running sweeper; dropping it without calling `shutdown`
/// leaves the task running for the life of the process.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for an in-flight sweep to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
        tracing::info!("Expiry sweeper stopped");
    }
}

impl ExpirySweeper {
    pub fn new(repository: Repository, config: CirculationConfig) -> Self {
        Self { repository, config }
    }

    /// Spawn the periodic sweep task
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let interval = std::time::Duration::from_secs(self.config.sweep_interval_minutes * 60);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately
            tracing::info!(
                "Expiry sweeper started (every {} min, threshold {} h)",
                self.config.sweep_interval_minutes,
                self.config.pickup_expiry_hours
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.sweep_expired_pickups().await {
                            Ok(0) => {}
                            Ok(n) => {
                                tracing::info!("Auto-cancelled {} expired pickup request(s)", n)
                            }
                            Err(e) => tracing::error!("Expired pickup sweep failed: {}", e),
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Cancel PENDING loans older than the pickup threshold and free their
    /// copies. Zero matches is the normal case and is silent.
    pub async fn sweep_expired_pickups(&self) -> AppResult<u64> {
        let now = Utc::now();
        let cutoff = now - Duration::hours(self.config.pickup_expiry_hours);

        let mut tx = self.repository.pool.begin().await?;

        let expired = self.repository.loans.find_expired_pending(&mut tx, cutoff).await?;
        if expired.is_empty() {
            tx.rollback().await?;
            return Ok(0);
        }

        for loan in &expired {
            self.repository.loans.set_cancelled(&mut tx, loan.id).await?;
            self.repository.copies.release(&mut tx, loan.copy_id, now).await?;
            tracing::debug!(
                "Expired pickup: loan {} (created {}) cancelled, copy {} freed",
                loan.id,
                loan.created_at,
                loan.copy_id
            );
        }

        tx.commit().await?;
        Ok(expired.len() as u64)
    }
}
