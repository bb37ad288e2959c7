//! Calendar service - month views and local event management

use std::sync::Arc;

use chrono::Utc;
use opcal_domain::constants::MAX_EVENT_MEMBERS;
use opcal_domain::{
    CalendarEntry, CharacterId, EventDraft, EventMember, EventNotification, ImportedEvent,
    LocalEvent, LocalEventId, MonthCursor, NewLocalEvent, OpCalError, Permission, Result, UserId,
    Viewer,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::ports::{LocalEventRepository, NotificationSender, VisibilityFilterRepository};
use crate::reconciliation::ports::ImportedEventRepository;
use crate::visibility;

/// Entries of one month visible to a viewer, ordered by start.
#[derive(Debug, Clone, Serialize)]
pub struct MonthView {
    pub month: MonthCursor,
    pub prev: MonthCursor,
    pub next: MonthCursor,
    pub entries: Vec<CalendarEntry>,
}

/// A local event as shown on its detail page.
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub event: LocalEvent,
    pub members: Vec<EventMember>,
    pub can_edit: bool,
}

pub struct CalendarService {
    events: Arc<dyn LocalEventRepository>,
    filters: Arc<dyn VisibilityFilterRepository>,
    imported: Arc<dyn ImportedEventRepository>,
    notifier: Option<Arc<dyn NotificationSender>>,
}

impl CalendarService {
    pub fn new(
        events: Arc<dyn LocalEventRepository>,
        filters: Arc<dyn VisibilityFilterRepository>,
        imported: Arc<dyn ImportedEventRepository>,
    ) -> Self {
        Self { events, filters, imported, notifier: None }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSender>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[instrument(skip(self, viewer, month), fields(user_id = viewer.user_id, month = %month))]
    pub async fn month_view(&self, viewer: &Viewer, month: MonthCursor) -> Result<MonthView> {
        require(viewer, Permission::BasicAccess)?;
        let (from, to) = month.range()?;

        let mut entries: Vec<CalendarEntry> = self
            .events
            .list_between(from, to)
            .await?
            .into_iter()
            .map(CalendarEntry::Local)
            .collect();

        if viewer.has(Permission::ViewIngame) {
            entries.extend(
                self.imported.list_between(from, to).await?.into_iter().map(CalendarEntry::Imported),
            );
        }
        entries.sort_by_key(CalendarEntry::start);

        let entries = visibility::visible_events(viewer, entries);
        debug!(visible = entries.len(), "month view computed");

        Ok(MonthView { month, prev: month.prev(), next: month.next(), entries })
    }

    /// Hidden events are reported as missing.
    pub async fn event_detail(&self, viewer: &Viewer, id: LocalEventId) -> Result<EventView> {
        require(viewer, Permission::BasicAccess)?;
        let event = self.visible_event(viewer, id).await?;
        let members = self.events.list_members(id).await?;
        let can_edit = visibility::can_edit(viewer, &event);
        Ok(EventView { event, members, can_edit })
    }

    pub async fn imported_event_detail(
        &self,
        viewer: &Viewer,
        event_id: i64,
    ) -> Result<ImportedEvent> {
        require(viewer, Permission::BasicAccess)?;
        require(viewer, Permission::ViewIngame)?;
        self.imported
            .find_by_event_id(event_id)
            .await?
            .ok_or_else(|| OpCalError::NotFound(format!("imported event {event_id}")))
    }

    /// Create a local event and notify the filter's webhook when applicable.
    /// Notification failures are logged and do not fail the creation.
    #[instrument(skip(self, viewer, draft), fields(user_id = viewer.user_id, title = %draft.title))]
    pub async fn create_event(
        &self,
        viewer: &Viewer,
        draft: EventDraft,
        character: Option<CharacterId>,
    ) -> Result<LocalEvent> {
        require(viewer, Permission::CreateEvent)?;
        self.check_draft(&draft, None).await?;

        let created = self
            .events
            .create(&NewLocalEvent {
                draft,
                created_by: viewer.user_id,
                created_character: character,
                created_at: Utc::now(),
            })
            .await?;
        info!(event_id = created.id, "local event created");

        self.notify_created(&created).await;
        Ok(created)
    }

    #[instrument(skip(self, viewer, draft), fields(user_id = viewer.user_id))]
    pub async fn update_event(
        &self,
        viewer: &Viewer,
        id: LocalEventId,
        draft: EventDraft,
    ) -> Result<LocalEvent> {
        let existing = self.get_event(id).await?;
        if !visibility::can_edit(viewer, &existing) {
            return Err(OpCalError::PermissionDenied(format!("cannot edit event {id}")));
        }
        self.check_draft(&draft, Some(id)).await?;

        let updated = self.events.update(id, &draft).await?;
        info!(event_id = id, "local event updated");
        Ok(updated)
    }

    pub async fn delete_event(&self, viewer: &Viewer, id: LocalEventId) -> Result<()> {
        require(viewer, Permission::ManageEvent)?;
        if !self.events.delete(id).await? {
            return Err(OpCalError::NotFound(format!("event {id}")));
        }
        info!(event_id = id, user_id = viewer.user_id, "local event deleted");
        Ok(())
    }

    /// Sign `user_id` up for an event. Viewers may sign themselves up for
    /// events they can see; signing up someone else needs the manage
    /// permission.
    pub async fn add_member(
        &self,
        viewer: &Viewer,
        event_id: LocalEventId,
        user_id: UserId,
        character: Option<CharacterId>,
    ) -> Result<EventMember> {
        if user_id == viewer.user_id {
            require(viewer, Permission::BasicAccess)?;
        } else {
            require(viewer, Permission::ManageEvent)?;
        }
        self.visible_event(viewer, event_id).await?;

        let members = self.events.list_members(event_id).await?;
        if members.iter().any(|m| m.user_id == user_id) {
            return Err(OpCalError::Conflict(format!(
                "user {user_id} already signed up for event {event_id}"
            )));
        }
        if members.len() >= MAX_EVENT_MEMBERS {
            return Err(OpCalError::Conflict(format!(
                "event {event_id} is full ({MAX_EVENT_MEMBERS} members)"
            )));
        }

        let member =
            EventMember { event_id, user_id, character_id: character, joined_at: Utc::now() };
        self.events.add_member(&member).await?;
        Ok(member)
    }

    async fn get_event(&self, id: LocalEventId) -> Result<LocalEvent> {
        self.events.get(id).await?.ok_or_else(|| OpCalError::NotFound(format!("event {id}")))
    }

    async fn visible_event(&self, viewer: &Viewer, id: LocalEventId) -> Result<LocalEvent> {
        let event = self.get_event(id).await?;
        if visibility::local_event_visible(&event, viewer) {
            Ok(event)
        } else {
            Err(OpCalError::NotFound(format!("event {id}")))
        }
    }

    async fn check_draft(&self, draft: &EventDraft, excluding: Option<LocalEventId>) -> Result<()> {
        draft.validate()?;

        if let Some(filter_id) = draft.visibility_id {
            if self.filters.get(filter_id).await?.is_none() {
                return Err(OpCalError::InvalidInput(format!(
                    "unknown visibility filter {filter_id}"
                )));
            }
        }

        if self.events.title_taken(&draft.title, draft.start, excluding).await? {
            return Err(OpCalError::Conflict(format!(
                "an event titled '{}' already starts at {}",
                draft.title, draft.start
            )));
        }
        Ok(())
    }

    async fn notify_created(&self, event: &LocalEvent) {
        let (Some(notifier), Some(filter)) = (&self.notifier, &event.visibility) else {
            return;
        };
        let Some(webhook_id) = visibility::notification_target(filter, event.start, Utc::now())
        else {
            return;
        };

        let webhook = match self.filters.get_webhook(webhook_id).await {
            Ok(Some(webhook)) if webhook.enabled => webhook,
            Ok(_) => {
                debug!(webhook_id, "webhook missing or disabled, not notifying");
                return;
            }
            Err(err) => {
                warn!(webhook_id, error = %err, "failed to load webhook");
                return;
            }
        };

        let notification = EventNotification {
            webhook_id,
            filter_name: filter.name.clone(),
            event_id: event.id,
            title: event.title.clone(),
            start: event.start,
        };
        if let Err(err) = notifier.notify(&webhook, &notification).await {
            warn!(event_id = event.id, webhook_id, error = %err, "event notification failed");
        }
    }
}

fn require(viewer: &Viewer, permission: Permission) -> Result<()> {
    if viewer.has(permission) {
        Ok(())
    } else {
        Err(OpCalError::PermissionDenied(permission.to_string()))
    }
}
