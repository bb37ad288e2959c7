//! Converges an owner's imported-event cache onto its remote calendar.
//!
//! A sync is a set reconciliation keyed by remote event id:
//!
//! 1. inactive owners are skipped
//! 2. a credential is resolved (any failure aborts before touching storage)
//! 3. the cached ids are snapshotted as the removal candidates
//! 4. every listed id already cached is kept untouched; every new id has its
//!    detail fetched and is stored
//! 5. candidates that were not listed are purged
//!
//! Cached events are never updated in place, so upstream edits to an event
//! that was already imported are not picked up.
//!
//! There is no transaction around a sync. A failure during step 4 stops the
//! run with the events created so far kept and nothing purged; the next run
//! picks up from there without duplicating rows.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use opcal_domain::constants::{CALENDAR_READ_SCOPE, DEFAULT_REMOTE_TIMEOUT_SECS};
use opcal_domain::{ImportedEvent, Owner, OwnerErrorState, OwnerId};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use super::ports::ImportedEventRepository;
use crate::credentials::CredentialResolver;
use crate::feed::ports::{FeedError, RemoteCalendarFeed};

/// Step of a sync, reported with failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Credential,
    Snapshot,
    Listing,
    Detail,
    Persist,
    Purge,
}

impl SyncStage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::Snapshot => "snapshot",
            Self::Listing => "listing",
            Self::Detail => "detail",
            Self::Persist => "persist",
            Self::Purge => "purge",
        }
    }
}

/// Outcome and mutation counts of one sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub owner_id: OwnerId,
    pub state: OwnerErrorState,
    /// Stage that failed; `None` on success or skip.
    pub stage: Option<SyncStage>,
    pub created: usize,
    pub retained: usize,
    pub deleted: usize,
}

impl SyncReport {
    fn new(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            state: OwnerErrorState::None,
            stage: None,
            created: 0,
            retained: 0,
            deleted: 0,
        }
    }

    fn failed(mut self, stage: SyncStage, state: OwnerErrorState) -> Self {
        self.stage = Some(stage);
        self.state = state;
        self
    }
}

pub struct ReconciliationEngine {
    resolver: Arc<CredentialResolver>,
    feed: Arc<dyn RemoteCalendarFeed>,
    events: Arc<dyn ImportedEventRepository>,
    remote_timeout: Duration,
}

impl ReconciliationEngine {
    pub fn new(
        resolver: Arc<CredentialResolver>,
        feed: Arc<dyn RemoteCalendarFeed>,
        events: Arc<dyn ImportedEventRepository>,
    ) -> Self {
        Self {
            resolver,
            feed,
            events,
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
        }
    }

    /// Bound applied to every remote call; hitting it counts as
    /// [`OwnerErrorState::RemoteUnavailable`].
    #[must_use]
    pub const fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn resolver(&self) -> &Arc<CredentialResolver> {
        &self.resolver
    }

    /// Sync `owner` and return only the outcome.
    pub async fn sync(&self, owner: &Owner) -> OwnerErrorState {
        self.sync_with_report(owner).await.state
    }

    #[instrument(skip(self, owner), fields(owner_id = owner.id))]
    pub async fn sync_with_report(&self, owner: &Owner) -> SyncReport {
        let mut report = SyncReport::new(owner.id);

        if !owner.is_active {
            debug!(owner_id = owner.id, "owner inactive, skipping sync");
            return report;
        }

        let credential = match self.resolver.resolve(owner, &[CALENDAR_READ_SCOPE]).await {
            Ok(credential) => credential,
            Err(state) => {
                log_abort(owner.id, SyncStage::Credential, state, &state);
                return report.failed(SyncStage::Credential, state);
            }
        };

        let Some(character_id) = owner.character.as_ref().map(|c| c.character_id) else {
            return report.failed(SyncStage::Credential, OwnerErrorState::NoCharacter);
        };

        let cached: HashSet<i64> = match self.events.list_event_ids(owner.id).await {
            Ok(ids) => ids.into_iter().collect(),
            Err(err) => {
                log_abort(owner.id, SyncStage::Snapshot, OwnerErrorState::Unknown, &err);
                return report.failed(SyncStage::Snapshot, OwnerErrorState::Unknown);
            }
        };
        let mut to_remove = cached.clone();
        debug!(owner_id = owner.id, cached = cached.len(), "snapshot of cached events taken");

        let summaries =
            match self.call_remote(self.feed.list_events(character_id, &credential)).await {
                Ok(summaries) => summaries,
                Err(err) => {
                    let state = err.error_state();
                    log_abort(owner.id, SyncStage::Listing, state, &err);
                    return report.failed(SyncStage::Listing, state);
                }
            };

        let mut created_ids = HashSet::new();

        for summary in &summaries {
            if cached.contains(&summary.event_id) {
                if to_remove.remove(&summary.event_id) {
                    report.retained += 1;
                }
                continue;
            }
            if created_ids.contains(&summary.event_id) {
                continue;
            }

            let detail = match self
                .call_remote(self.feed.get_event_detail(character_id, summary.event_id, &credential))
                .await
            {
                Ok(detail) => detail,
                Err(err) => {
                    let state = err.error_state();
                    log_abort(owner.id, SyncStage::Detail, state, &err);
                    return report.failed(SyncStage::Detail, state);
                }
            };

            let event = ImportedEvent::from_remote(owner.id, summary, &detail);
            if let Err(err) = self.events.create(&event).await {
                log_abort(owner.id, SyncStage::Persist, OwnerErrorState::Unknown, &err);
                return report.failed(SyncStage::Persist, OwnerErrorState::Unknown);
            }

            debug!(owner_id = owner.id, event_id = event.event_id, title = %event.title, "imported new event");
            created_ids.insert(summary.event_id);
            report.created += 1;
        }

        if !to_remove.is_empty() {
            let mut stale: Vec<i64> = to_remove.into_iter().collect();
            stale.sort_unstable();
            match self.events.delete_many(owner.id, &stale).await {
                Ok(deleted) => report.deleted = deleted,
                Err(err) => {
                    log_abort(owner.id, SyncStage::Purge, OwnerErrorState::Unknown, &err);
                    return report.failed(SyncStage::Purge, OwnerErrorState::Unknown);
                }
            }
        }

        info!(
            owner_id = owner.id,
            listed = summaries.len(),
            created = report.created,
            retained = report.retained,
            deleted = report.deleted,
            "owner calendar synced"
        );
        report
    }

    async fn call_remote<T, F>(&self, call: F) -> Result<T, FeedError>
    where
        F: Future<Output = Result<T, FeedError>>,
    {
        tokio::time::timeout(self.remote_timeout, call)
            .await
            .unwrap_or_else(|_| Err(FeedError::Timeout(self.remote_timeout)))
    }
}

fn log_abort(
    owner_id: OwnerId,
    stage: SyncStage,
    state: OwnerErrorState,
    err: &dyn std::fmt::Display,
) {
    if state == OwnerErrorState::Unknown {
        error!(
            owner_id,
            stage = stage.label(),
            error_state = state.label(),
            error = %err,
            "owner sync aborted"
        );
    } else {
        warn!(
            owner_id,
            stage = stage.label(),
            error_state = state.label(),
            error = %err,
            "owner sync aborted"
        );
    }
}
