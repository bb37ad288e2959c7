//! Periodic owner synchronization.
//!
//! A cron job lists the active owners and runs [`OwnerService::sync_owner`]
//! for each, at most `max_concurrent_owners` at a time. One owner failing
//! never stops the others; each outcome is recorded on its owner row by the
//! service. Join handles are tracked, cancellation is explicit, and every
//! asynchronous lifecycle step is wrapped in a timeout.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use opcal_core::OwnerService;
//! use opcal_infra::scheduling::{OwnerSyncScheduler, OwnerSyncSchedulerConfig, SchedulerResult};
//!
//! # async fn example(service: Arc<OwnerService>) -> SchedulerResult<()> {
//! let mut scheduler = OwnerSyncScheduler::with_config(
//!     OwnerSyncSchedulerConfig {
//!         cron_expression: "0 */15 * * * *".into(), // every 15 minutes
//!         ..Default::default()
//!     },
//!     service,
//! );
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use opcal_core::OwnerService;
use opcal_domain::constants::{
    DEFAULT_MAX_CONCURRENT_OWNERS, DEFAULT_SYNC_CRON, DEFAULT_SYNC_JOB_TIMEOUT_SECS,
};
use opcal_domain::{OpCalError, SyncConfig};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerPhase, SchedulerResult};

#[derive(Debug, Clone)]
pub struct OwnerSyncSchedulerConfig {
    /// Six-field cron expression (seconds first).
    pub cron_expression: String,
    /// Bound on one full pass over all active owners.
    pub job_timeout: Duration,
    pub max_concurrent_owners: usize,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for OwnerSyncSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: DEFAULT_SYNC_CRON.into(),
            job_timeout: Duration::from_secs(DEFAULT_SYNC_JOB_TIMEOUT_SECS),
            max_concurrent_owners: DEFAULT_MAX_CONCURRENT_OWNERS,
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&SyncConfig> for OwnerSyncSchedulerConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            cron_expression: config.cron_expression.clone(),
            job_timeout: Duration::from_secs(config.job_timeout_secs.max(1)),
            max_concurrent_owners: config.max_concurrent_owners.max(1),
            ..Default::default()
        }
    }
}

/// Counts for one pass over the active owners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncBatchSummary {
    pub owners: usize,
    /// Sync ran and ended without an error state.
    pub succeeded: usize,
    /// Sync ran and recorded an error state on the owner.
    pub failed: usize,
    /// Sync could not run (already in flight, owner vanished, storage error).
    pub skipped: usize,
}

pub struct OwnerSyncScheduler {
    scheduler: Option<JobScheduler>,
    config: OwnerSyncSchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    service: Arc<OwnerService>,
}

impl OwnerSyncScheduler {
    pub fn new(service: Arc<OwnerService>) -> Self {
        Self::with_config(OwnerSyncSchedulerConfig::default(), service)
    }

    pub fn with_config(config: OwnerSyncSchedulerConfig, service: Arc<OwnerService>) -> Self {
        Self {
            scheduler: None,
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            service,
        }
    }

    pub fn config(&self) -> &OwnerSyncSchedulerConfig {
        &self.config
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self), fields(cron = %self.config.cron_expression))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler_instance = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|_| SchedulerError::Timeout {
                phase: SchedulerPhase::Start,
                seconds: start_timeout.as_secs(),
            })?
            .map_err(|err| SchedulerError::engine(SchedulerPhase::Start, err))?;

        self.scheduler = Some(scheduler_instance);

        let cancel = self.cancellation.clone();
        self.monitor_handle = Some(tokio::spawn(Self::monitor_task(cancel)));

        info!("Owner sync scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let Some(mut scheduler) = self.scheduler.take() else {
            return Err(SchedulerError::NotRunning);
        };

        self.cancellation.cancel();

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, scheduler.shutdown())
            .await
            .map_err(|_| SchedulerError::Timeout {
                phase: SchedulerPhase::Stop,
                seconds: stop_timeout.as_secs(),
            })?
            .map_err(|err| SchedulerError::engine(SchedulerPhase::Stop, err))?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout {
                    phase: SchedulerPhase::Join,
                    seconds: join_timeout.as_secs(),
                })?
                .map_err(|err| SchedulerError::engine(SchedulerPhase::Join, err))?;
        }

        info!("Owner sync scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    /// Run one pass immediately, outside the cron schedule.
    pub async fn run_once(&self) -> Result<SyncBatchSummary, OpCalError> {
        sync_active_owners(self.service.clone(), self.config.max_concurrent_owners).await
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler =
            JobScheduler::new().await.map_err(|err| SchedulerError::engine(SchedulerPhase::Create, err))?;

        let service = self.service.clone();
        let job_timeout = self.config.job_timeout;
        let max_concurrent = self.config.max_concurrent_owners;
        let cancel = self.cancellation.clone();

        let job = Job::new_async(self.config.cron_expression.as_str(), move |_id, _lock| {
            let service = service.clone();
            let cancel = cancel.clone();

            Box::pin(async move {
                if cancel.is_cancelled() {
                    return;
                }
                let started = Instant::now();

                match tokio::time::timeout(job_timeout, sync_active_owners(service, max_concurrent))
                    .await
                {
                    Ok(Ok(summary)) => info!(
                        owners = summary.owners,
                        succeeded = summary.succeeded,
                        failed = summary.failed,
                        skipped = summary.skipped,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Owner sync pass finished"
                    ),
                    Ok(Err(err)) => error!(error = %err, "Owner sync pass could not list owners"),
                    Err(_) => {
                        warn!(timeout_secs = job_timeout.as_secs(), "Owner sync pass timed out")
                    }
                }
            })
        })
        .map_err(|err| SchedulerError::InvalidSchedule {
            expression: self.config.cron_expression.clone(),
            reason: err.to_string(),
        })?;

        let job_id = job.guid();
        scheduler
            .add(job)
            .await
            .map_err(|err| SchedulerError::engine(SchedulerPhase::Register, err))?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "Registered owner sync job");
        Ok(scheduler)
    }

    async fn monitor_task(cancel: CancellationToken) {
        cancel.cancelled().await;
        debug!("Owner sync scheduler monitor cancelled");
    }
}

/// Sync every active owner, bounded by `max_concurrent` in flight.
///
/// Only the owner listing can fail the pass; per-owner errors are logged
/// and counted.
pub async fn sync_active_owners(
    service: Arc<OwnerService>,
    max_concurrent: usize,
) -> Result<SyncBatchSummary, OpCalError> {
    let owners = service.list_active().await?;
    let mut summary = SyncBatchSummary { owners: owners.len(), ..Default::default() };
    if owners.is_empty() {
        debug!("No active owners to sync");
        return Ok(summary);
    }

    let permits = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = JoinSet::new();

    for owner in owners {
        let service = service.clone();
        let permits = permits.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            (owner.id, service.sync_owner(owner.id).await)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((owner_id, Ok(report))) if report.state.is_ok() => {
                summary.succeeded += 1;
                debug!(
                    owner_id,
                    created = report.created,
                    deleted = report.deleted,
                    "Owner synced"
                );
            }
            Ok((owner_id, Ok(report))) => {
                summary.failed += 1;
                warn!(
                    owner_id,
                    state = report.state.label(),
                    stage = report.stage.map(|s| s.label()),
                    "Owner sync recorded an error state"
                );
            }
            Ok((owner_id, Err(err))) => {
                summary.skipped += 1;
                warn!(owner_id, error = %err, "Owner sync did not run");
            }
            Err(err) => {
                summary.skipped += 1;
                error!(error = %err, "Owner sync task panicked");
            }
        }
    }

    Ok(summary)
}

impl Drop for OwnerSyncScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("OwnerSyncScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
