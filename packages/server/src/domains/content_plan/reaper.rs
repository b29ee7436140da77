//! Background sweep for expired continuation claims.
//!
//! A continuation releases its claim on every exit path, so this loop
//! only matters when a worker dies mid-run. Once the lease expires the
//! sweep flips the job back to claimable; until then concurrent workers
//! keep treating it as held.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::PgPool;
use tracing::{debug, error, info};

use super::models::Job;

pub struct ClaimReaper {
    pool: PgPool,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl ClaimReaper {
    pub fn new(pool: PgPool, interval: Duration) -> Self {
        Self {
            pool,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a shutdown handle for graceful shutdown.
    ///
    /// Call `store(true, Ordering::SeqCst)` on the returned Arc to stop the
    /// sweep loop.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Run the sweep loop until shutdown is requested.
    pub async fn run(self) -> Result<()> {
        info!(
            interval_secs = self.interval.as_secs(),
            "claim reaper starting"
        );

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            match Job::reap_expired_claims(&self.pool).await {
                Ok(0) => debug!("no expired job claims"),
                Ok(reaped) => info!(reaped, "cleared expired job claims"),
                Err(e) => error!(error = %e, "failed to reap expired job claims"),
            }

            tokio::time::sleep(self.interval).await;
        }

        info!("claim reaper stopped");
        Ok(())
    }
}
