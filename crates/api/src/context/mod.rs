//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use opcal_common::PoolHealth;
use opcal_core::{CalendarService, CredentialResolver, OwnerService, ReconciliationEngine};
use opcal_domain::{Config, OpCalError, Result};
use opcal_infra::scheduling::{sync_active_owners, SyncBatchSummary};
use opcal_infra::{
    load_config, DbManager, EsiCalendarClient, OwnerSyncScheduler, OwnerSyncSchedulerConfig,
    SqliteCredentialStore, SqliteImportedEventRepository, SqliteLocalEventRepository,
    SqliteOwnerRepository, SqliteUserDirectory, SqliteVisibilityFilterRepository,
    SsoTokenRefresher,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::adapters::LoggingNotificationSender;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub directory: Arc<SqliteUserDirectory>,
    pub credentials: Arc<SqliteCredentialStore>,
    pub owners: Arc<OwnerService>,
    pub calendar: Arc<CalendarService>,
    scheduler: Mutex<OwnerSyncScheduler>,
}

impl AppContext {
    /// Build the context from the loaded configuration.
    pub async fn new() -> Result<Self> {
        let config = load_config()?;
        Self::new_with_config(config).await
    }

    /// Wire every adapter, apply migrations and start the sync scheduler
    /// when `config.sync.enabled`.
    pub async fn new_with_config(config: Config) -> Result<Self> {
        let db = Arc::new(DbManager::from_config(&config.database)?);
        db.run_migrations()?;
        info!(path = %db.path().display(), "database ready");

        let refresher = SsoTokenRefresher::from_config(&config.remote)?;
        if refresher.is_none() {
            warn!("no SSO client configured; expired tokens will not be refreshed");
        }
        let mut credentials = SqliteCredentialStore::new(db.clone());
        if let Some(refresher) = refresher {
            credentials = credentials.with_refresher(Arc::new(refresher));
        }
        let credentials = Arc::new(credentials);

        let directory = Arc::new(SqliteUserDirectory::new(db.clone()));
        let owner_repository = Arc::new(SqliteOwnerRepository::new(db.clone()));
        let imported = Arc::new(SqliteImportedEventRepository::new(db.clone()));
        let feed = Arc::new(EsiCalendarClient::from_config(&config.remote)?);

        let resolver = Arc::new(CredentialResolver::new(credentials.clone(), directory.clone()));
        let engine = Arc::new(
            ReconciliationEngine::new(resolver, feed, imported.clone())
                .with_remote_timeout(Duration::from_secs(config.remote.timeout_secs.max(1))),
        );
        let owners = Arc::new(OwnerService::new(owner_repository, directory.clone(), engine));

        let calendar = Arc::new(
            CalendarService::new(
                Arc::new(SqliteLocalEventRepository::new(db.clone())),
                Arc::new(SqliteVisibilityFilterRepository::new(db.clone())),
                imported,
            )
            .with_notifier(Arc::new(LoggingNotificationSender)),
        );

        let mut scheduler = OwnerSyncScheduler::with_config(
            OwnerSyncSchedulerConfig::from(&config.sync),
            owners.clone(),
        );
        if config.sync.enabled {
            scheduler.start().await.map_err(|err| {
                tracing::error!(error = %err, "failed to start OwnerSyncScheduler");
                OpCalError::from(err)
            })?;
        } else {
            info!("periodic owner sync disabled");
        }

        Ok(Self {
            config,
            db,
            directory,
            credentials,
            owners,
            calendar,
            scheduler: Mutex::new(scheduler),
        })
    }

    pub async fn is_scheduler_running(&self) -> bool {
        self.scheduler.lock().await.is_running()
    }

    /// Sync every active owner now, outside the schedule.
    ///
    /// The scheduler lock is only held to read the fan-out limit, so
    /// `shutdown` is not blocked by a running pass.
    pub async fn sync_all_now(&self) -> Result<SyncBatchSummary> {
        let max_concurrent = self.scheduler.lock().await.config().max_concurrent_owners;
        sync_active_owners(self.owners.clone(), max_concurrent).await
    }

    pub fn health_check(&self) -> Result<PoolHealth> {
        self.db.health_check()
    }

    /// Stop the scheduler if it is running. Safe to call more than once.
    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.lock().await;
        if scheduler.is_running() {
            scheduler.stop().await?;
        }
        info!("application context shut down");
        Ok(())
    }
}
