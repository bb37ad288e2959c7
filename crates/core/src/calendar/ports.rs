//! Port interfaces for local events, visibility filters and notifications
//!
//! Webhook delivery is outside this crate; [`NotificationSender`] is the
//! seam it plugs into.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opcal_domain::{
    EventDraft, EventMember, EventNotification, LocalEvent, LocalEventId, NewLocalEvent, Result,
    VisibilityFilter, VisibilityFilterId, WebHook, WebHookId,
};

#[async_trait]
pub trait LocalEventRepository: Send + Sync {
    async fn get(&self, id: LocalEventId) -> Result<Option<LocalEvent>>;

    /// Events starting in `[from, to)`, ordered by start.
    async fn list_between(&self, from: DateTime<Utc>, to: DateTime<Utc>)
        -> Result<Vec<LocalEvent>>;

    /// Whether another event already uses `(title, start)`.
    async fn title_taken(
        &self,
        title: &str,
        start: DateTime<Utc>,
        excluding: Option<LocalEventId>,
    ) -> Result<bool>;

    /// Fails with `Conflict` when `(title, start)` is taken.
    async fn create(&self, event: &NewLocalEvent) -> Result<LocalEvent>;

    async fn update(&self, id: LocalEventId, draft: &EventDraft) -> Result<LocalEvent>;

    /// Returns false when the event did not exist.
    async fn delete(&self, id: LocalEventId) -> Result<bool>;

    async fn list_members(&self, event_id: LocalEventId) -> Result<Vec<EventMember>>;

    /// Fails with `Conflict` when the user already signed up.
    async fn add_member(&self, member: &EventMember) -> Result<()>;
}

#[async_trait]
pub trait VisibilityFilterRepository: Send + Sync {
    async fn get(&self, id: VisibilityFilterId) -> Result<Option<VisibilityFilter>>;

    async fn list(&self) -> Result<Vec<VisibilityFilter>>;

    /// Insert when `filter.id == 0`, otherwise update; group and tier sets
    /// are replaced wholesale.
    async fn save(&self, filter: &VisibilityFilter) -> Result<VisibilityFilter>;

    async fn get_webhook(&self, id: WebHookId) -> Result<Option<WebHook>>;

    /// Insert when `webhook.id == 0`, otherwise update.
    async fn save_webhook(&self, webhook: &WebHook) -> Result<WebHook>;
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn notify(&self, webhook: &WebHook, notification: &EventNotification) -> Result<()>;
}
