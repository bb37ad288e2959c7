//! In-memory repositories
//!
//! Each mock keeps its rows behind a `Mutex` so tests can inspect state after
//! driving a service.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opcal_core::{
    ImportedEventRepository, LocalEventRepository, NotificationSender, OwnerRepository,
    VisibilityFilterRepository,
};
use opcal_domain::{
    EventDraft, EventMember, EventNotification, ImportedEvent, LocalEvent, LocalEventId,
    NewLocalEvent, OpCalError, Owner, OwnerErrorState, OwnerId, OwnerRegistration,
    Result as DomainResult, VisibilityFilter, VisibilityFilterId, WebHook, WebHookId,
};

fn storage_down() -> OpCalError {
    OpCalError::Database("storage unavailable".into())
}

/// In-memory `ImportedEventRepository` keyed by `(owner_id, event_id)`.
#[derive(Default)]
pub struct InMemoryImportedEvents {
    rows: Mutex<BTreeMap<(OwnerId, i64), ImportedEvent>>,
    creates: Mutex<usize>,
    deletes: Mutex<usize>,
    fail_snapshot: Mutex<bool>,
    fail_create: Mutex<bool>,
    fail_delete: Mutex<bool>,
}

impl InMemoryImportedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, event: ImportedEvent) {
        self.rows.lock().unwrap().insert((event.owner_id, event.event_id), event);
    }

    pub fn ids(&self, owner_id: OwnerId) -> Vec<i64> {
        self.rows
            .lock()
            .unwrap()
            .keys()
            .filter(|(owner, _)| *owner == owner_id)
            .map(|(_, id)| *id)
            .collect()
    }

    pub fn row(&self, owner_id: OwnerId, event_id: i64) -> Option<ImportedEvent> {
        self.rows.lock().unwrap().get(&(owner_id, event_id)).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Number of `create` calls that inserted a row.
    pub fn creates(&self) -> usize {
        *self.creates.lock().unwrap()
    }

    /// Number of rows removed through `delete_many`.
    pub fn deletes(&self) -> usize {
        *self.deletes.lock().unwrap()
    }

    pub fn fail_snapshot(&self) {
        *self.fail_snapshot.lock().unwrap() = true;
    }

    pub fn fail_create(&self) {
        *self.fail_create.lock().unwrap() = true;
    }

    pub fn fail_delete(&self) {
        *self.fail_delete.lock().unwrap() = true;
    }

    pub fn remove_owner(&self, owner_id: OwnerId) {
        self.rows.lock().unwrap().retain(|(owner, _), _| *owner != owner_id);
    }
}

#[async_trait]
impl ImportedEventRepository for InMemoryImportedEvents {
    async fn list_event_ids(&self, owner_id: OwnerId) -> DomainResult<Vec<i64>> {
        if *self.fail_snapshot.lock().unwrap() {
            return Err(storage_down());
        }
        Ok(self.ids(owner_id))
    }

    async fn create(&self, event: &ImportedEvent) -> DomainResult<()> {
        if *self.fail_create.lock().unwrap() {
            return Err(storage_down());
        }
        let mut rows = self.rows.lock().unwrap();
        let key = (event.owner_id, event.event_id);
        if !rows.contains_key(&key) {
            rows.insert(key, event.clone());
            *self.creates.lock().unwrap() += 1;
        }
        Ok(())
    }

    async fn delete_many(&self, owner_id: OwnerId, event_ids: &[i64]) -> DomainResult<usize> {
        if *self.fail_delete.lock().unwrap() {
            return Err(storage_down());
        }
        let mut rows = self.rows.lock().unwrap();
        let removed =
            event_ids.iter().filter(|id| rows.remove(&(owner_id, **id)).is_some()).count();
        *self.deletes.lock().unwrap() += removed;
        Ok(removed)
    }

    async fn list_for_owner(&self, owner_id: OwnerId) -> DomainResult<Vec<ImportedEvent>> {
        Ok(self.rows.lock().unwrap().values().filter(|e| e.owner_id == owner_id).cloned().collect())
    }

    async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<ImportedEvent>> {
        let mut events: Vec<ImportedEvent> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.start >= from && e.start < to)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start);
        Ok(events)
    }

    async fn find_by_event_id(&self, event_id: i64) -> DomainResult<Option<ImportedEvent>> {
        Ok(self.rows.lock().unwrap().values().find(|e| e.event_id == event_id).cloned())
    }
}

/// In-memory `OwnerRepository`; deleting an owner cascades into the attached
/// imported-event store when one is given.
#[derive(Default)]
pub struct InMemoryOwners {
    rows: Mutex<BTreeMap<OwnerId, Owner>>,
    events: Option<Arc<InMemoryImportedEvents>>,
}

impl InMemoryOwners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cascading_to(events: Arc<InMemoryImportedEvents>) -> Self {
        Self { rows: Mutex::default(), events: Some(events) }
    }

    pub fn seed(&self, owner: Owner) {
        self.rows.lock().unwrap().insert(owner.id, owner);
    }

    pub fn row(&self, id: OwnerId) -> Option<Owner> {
        self.rows.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl OwnerRepository for InMemoryOwners {
    async fn get(&self, id: OwnerId) -> DomainResult<Option<Owner>> {
        Ok(self.row(id))
    }

    async fn list(&self) -> DomainResult<Vec<Owner>> {
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    async fn list_active(&self) -> DomainResult<Vec<Owner>> {
        Ok(self.rows.lock().unwrap().values().filter(|o| o.is_active).cloned().collect())
    }

    async fn upsert(&self, registration: &OwnerRegistration) -> DomainResult<Owner> {
        let mut rows = self.rows.lock().unwrap();
        let existing = rows.values_mut().find(|owner| match &registration.corporation {
            Some(corp) => owner
                .corporation
                .as_ref()
                .is_some_and(|c| c.corporation_id == corp.corporation_id),
            None => {
                owner.corporation.is_none()
                    && owner.character.as_ref().is_some_and(|c| {
                        c.character_id == registration.character.character_id
                    })
            }
        });

        if let Some(owner) = existing {
            owner.corporation = registration.corporation.clone();
            owner.character = Some(registration.character.clone());
            owner.is_active = true;
            return Ok(owner.clone());
        }

        let id = rows.keys().next_back().copied().unwrap_or(0) + 1;
        let owner = Owner {
            id,
            corporation: registration.corporation.clone(),
            character: Some(registration.character.clone()),
            is_active: true,
            last_sync_at: None,
            last_error: OwnerErrorState::None,
        };
        rows.insert(id, owner.clone());
        Ok(owner)
    }

    async fn set_active(&self, id: OwnerId, active: bool) -> DomainResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let owner = rows.get_mut(&id).ok_or_else(|| OpCalError::NotFound(format!("owner {id}")))?;
        owner.is_active = active;
        Ok(())
    }

    async fn record_sync_outcome(
        &self,
        id: OwnerId,
        state: OwnerErrorState,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let owner = rows.get_mut(&id).ok_or_else(|| OpCalError::NotFound(format!("owner {id}")))?;
        owner.last_error = state;
        owner.last_sync_at = Some(at);
        Ok(())
    }

    async fn delete(&self, id: OwnerId) -> DomainResult<()> {
        self.rows.lock().unwrap().remove(&id);
        if let Some(events) = &self.events {
            events.remove_owner(id);
        }
        Ok(())
    }
}

/// In-memory `VisibilityFilterRepository`.
#[derive(Default)]
pub struct InMemoryFilters {
    filters: Mutex<BTreeMap<VisibilityFilterId, VisibilityFilter>>,
    webhooks: Mutex<BTreeMap<WebHookId, WebHook>>,
}

impl InMemoryFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, filter: VisibilityFilter) {
        self.filters.lock().unwrap().insert(filter.id, filter);
    }

    pub fn insert_webhook(&self, webhook: WebHook) {
        self.webhooks.lock().unwrap().insert(webhook.id, webhook);
    }

    fn filter(&self, id: VisibilityFilterId) -> Option<VisibilityFilter> {
        self.filters.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl VisibilityFilterRepository for InMemoryFilters {
    async fn get(&self, id: VisibilityFilterId) -> DomainResult<Option<VisibilityFilter>> {
        Ok(self.filter(id))
    }

    async fn list(&self) -> DomainResult<Vec<VisibilityFilter>> {
        Ok(self.filters.lock().unwrap().values().cloned().collect())
    }

    async fn save(&self, filter: &VisibilityFilter) -> DomainResult<VisibilityFilter> {
        let mut filters = self.filters.lock().unwrap();
        let mut saved = filter.clone();
        if saved.id == 0 {
            saved.id = filters.keys().next_back().copied().unwrap_or(0) + 1;
        }
        filters.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn get_webhook(&self, id: WebHookId) -> DomainResult<Option<WebHook>> {
        Ok(self.webhooks.lock().unwrap().get(&id).cloned())
    }

    async fn save_webhook(&self, webhook: &WebHook) -> DomainResult<WebHook> {
        let mut webhooks = self.webhooks.lock().unwrap();
        let mut saved = webhook.clone();
        if saved.id == 0 {
            saved.id = webhooks.keys().next_back().copied().unwrap_or(0) + 1;
        }
        webhooks.insert(saved.id, saved.clone());
        Ok(saved)
    }
}

/// In-memory `LocalEventRepository` resolving filters through an
/// [`InMemoryFilters`].
pub struct InMemoryLocalEvents {
    filters: Arc<InMemoryFilters>,
    events: Mutex<BTreeMap<LocalEventId, LocalEvent>>,
    members: Mutex<HashMap<LocalEventId, Vec<EventMember>>>,
}

impl InMemoryLocalEvents {
    pub fn new(filters: Arc<InMemoryFilters>) -> Self {
        Self { filters, events: Mutex::default(), members: Mutex::default() }
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    fn apply(&self, event: &mut LocalEvent, draft: &EventDraft) {
        event.category = draft.category.clone();
        event.title = draft.title.clone();
        event.host = draft.host.clone();
        event.doctrine = draft.doctrine.clone();
        event.formup_system = draft.formup_system.clone();
        event.description = draft.description.clone();
        event.start = draft.start;
        event.end = draft.end;
        event.fc = draft.fc.clone();
        event.visibility = draft.visibility_id.and_then(|id| self.filters.filter(id));
        event.external = draft.external;
    }

    fn taken(&self, title: &str, start: DateTime<Utc>, excluding: Option<LocalEventId>) -> bool {
        self.events
            .lock()
            .unwrap()
            .values()
            .any(|e| e.title == title && e.start == start && Some(e.id) != excluding)
    }
}

#[async_trait]
impl LocalEventRepository for InMemoryLocalEvents {
    async fn get(&self, id: LocalEventId) -> DomainResult<Option<LocalEvent>> {
        Ok(self.events.lock().unwrap().get(&id).cloned())
    }

    async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<LocalEvent>> {
        let mut events: Vec<LocalEvent> = self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.start >= from && e.start < to)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start);
        Ok(events)
    }

    async fn title_taken(
        &self,
        title: &str,
        start: DateTime<Utc>,
        excluding: Option<LocalEventId>,
    ) -> DomainResult<bool> {
        Ok(self.taken(title, start, excluding))
    }

    async fn create(&self, event: &NewLocalEvent) -> DomainResult<LocalEvent> {
        if self.taken(&event.draft.title, event.draft.start, None) {
            return Err(OpCalError::Conflict("duplicate (title, start)".into()));
        }
        let draft = &event.draft;
        let mut events = self.events.lock().unwrap();
        let id = events.keys().next_back().copied().unwrap_or(0) + 1;
        let mut created = LocalEvent {
            id,
            category: None,
            title: String::new(),
            host: String::new(),
            doctrine: String::new(),
            formup_system: String::new(),
            description: String::new(),
            start: draft.start,
            end: draft.end,
            fc: String::new(),
            visibility: None,
            external: false,
            created_by: event.created_by,
            created_character: event.created_character,
            created_at: event.created_at,
        };
        self.apply(&mut created, draft);
        events.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: LocalEventId, draft: &EventDraft) -> DomainResult<LocalEvent> {
        let mut events = self.events.lock().unwrap();
        let event = events.get_mut(&id).ok_or_else(|| OpCalError::NotFound(format!("event {id}")))?;
        self.apply(event, draft);
        Ok(event.clone())
    }

    async fn delete(&self, id: LocalEventId) -> DomainResult<bool> {
        self.members.lock().unwrap().remove(&id);
        Ok(self.events.lock().unwrap().remove(&id).is_some())
    }

    async fn list_members(&self, event_id: LocalEventId) -> DomainResult<Vec<EventMember>> {
        Ok(self.members.lock().unwrap().get(&event_id).cloned().unwrap_or_default())
    }

    async fn add_member(&self, member: &EventMember) -> DomainResult<()> {
        let mut members = self.members.lock().unwrap();
        let list = members.entry(member.event_id).or_default();
        if list.iter().any(|m| m.user_id == member.user_id) {
            return Err(OpCalError::Conflict("already signed up".into()));
        }
        list.push(member.clone());
        Ok(())
    }
}

/// `NotificationSender` that records what it was asked to deliver.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(WebHook, EventNotification)>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }

    pub fn sent(&self) -> Vec<(WebHook, EventNotification)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn notify(&self, webhook: &WebHook, notification: &EventNotification) -> DomainResult<()> {
        if *self.failing.lock().unwrap() {
            return Err(OpCalError::Network("webhook unreachable".into()));
        }
        self.sent.lock().unwrap().push((webhook.clone(), notification.clone()));
        Ok(())
    }
}
