//! Month views and local event management.

mod support;

use std::sync::Arc;

use chrono::{Duration, Utc};
use opcal_core::CalendarService;
use opcal_domain::{
    CalendarEntry, ImportedEvent, MonthCursor, OpCalError, Permission, Viewer, VisibilityFilter,
    WebHook,
};
use support::repositories::{
    InMemoryFilters, InMemoryImportedEvents, InMemoryLocalEvents, RecordingNotifier,
};
use support::{at, detail, draft, summary};

struct Harness {
    filters: Arc<InMemoryFilters>,
    events: Arc<InMemoryLocalEvents>,
    imported: Arc<InMemoryImportedEvents>,
    notifier: Arc<RecordingNotifier>,
    service: CalendarService,
}

impl Harness {
    fn new() -> Self {
        let filters = Arc::new(InMemoryFilters::new());
        let events = Arc::new(InMemoryLocalEvents::new(filters.clone()));
        let imported = Arc::new(InMemoryImportedEvents::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let service = CalendarService::new(events.clone(), filters.clone(), imported.clone())
            .with_notifier(notifier.clone());
        Self { filters, events, imported, notifier, service }
    }

    /// Filter 1 restricted to group 10, filter 2 unrestricted with webhook 1.
    fn with_filters(self) -> Self {
        let mut restricted = VisibilityFilter::open(1, "Alliance only");
        restricted.groups.insert(10);
        self.filters.insert(restricted);

        let mut announced = VisibilityFilter::open(2, "Public");
        announced.webhook_id = Some(1);
        self.filters.insert(announced);
        self.filters.insert_webhook(WebHook {
            id: 1,
            name: "pings".into(),
            url: "https://discord.example/webhook".into(),
            enabled: true,
        });
        self
    }
}

fn creator(user_id: i64) -> Viewer {
    Viewer::new(user_id).with_permissions([Permission::BasicAccess, Permission::CreateEvent])
}

fn member(user_id: i64) -> Viewer {
    Viewer::new(user_id).with_permissions([Permission::BasicAccess])
}

fn manager(user_id: i64) -> Viewer {
    Viewer::new(user_id).with_permissions([
        Permission::BasicAccess,
        Permission::CreateEvent,
        Permission::ManageEvent,
    ])
}

fn january() -> MonthCursor {
    MonthCursor::new(2024, 1).unwrap()
}

fn imported(event_id: i64, day: u32) -> ImportedEvent {
    ImportedEvent::from_remote(1, &summary(event_id, day, "CTA"), &detail(event_id))
}

#[tokio::test]
async fn month_view_merges_sorts_and_filters() {
    // Arrange
    let h = Harness::new().with_filters();
    let author = creator(1);
    h.service.create_event(&author, draft("Late op", at(20, 18)), None).await.unwrap();
    let mut hidden = draft("Secret op", at(5, 18));
    hidden.visibility_id = Some(1);
    h.service.create_event(&author, hidden, None).await.unwrap();
    h.imported.seed(imported(900, 10));
    h.service.create_event(&author, draft("Next month", at(31, 23) + Duration::hours(2)), None).await.unwrap();

    // Act
    let plain = h.service.month_view(&member(2), january()).await.unwrap();
    let privileged = Viewer::new(3)
        .with_groups([10])
        .with_permissions([Permission::BasicAccess, Permission::ViewIngame]);
    let full = h.service.month_view(&privileged, january()).await.unwrap();

    // Assert
    let titles = |entries: &[CalendarEntry]| -> Vec<String> {
        entries.iter().map(|e| e.title().to_string()).collect()
    };
    assert_eq!(titles(&plain.entries), vec!["Late op"]);
    assert_eq!(titles(&full.entries), vec!["Secret op", "CTA", "Late op"]);
    assert_eq!(full.prev, MonthCursor::new(2023, 12).unwrap());
    assert_eq!(full.next, MonthCursor::new(2024, 2).unwrap());
}

#[tokio::test]
async fn month_view_requires_basic_access() {
    let h = Harness::new();
    let err = h.service.month_view(&Viewer::new(1), january()).await.unwrap_err();
    assert!(matches!(err, OpCalError::PermissionDenied(_)));
}

#[tokio::test]
async fn hidden_event_detail_is_not_found() {
    let h = Harness::new().with_filters();
    let mut hidden = draft("Secret op", at(5, 18));
    hidden.visibility_id = Some(1);
    let event = h.service.create_event(&creator(1), hidden, None).await.unwrap();

    let err = h.service.event_detail(&member(2), event.id).await.unwrap_err();
    assert!(matches!(err, OpCalError::NotFound(_)));

    let insider = member(3).with_groups([10]);
    let view = h.service.event_detail(&insider, event.id).await.unwrap();
    assert_eq!(view.event.title, "Secret op");
    assert!(!view.can_edit);
}

#[tokio::test]
async fn imported_detail_needs_ingame_permission() {
    let h = Harness::new();
    h.imported.seed(imported(900, 10));

    let err = h.service.imported_event_detail(&member(1), 900).await.unwrap_err();
    assert!(matches!(err, OpCalError::PermissionDenied(_)));

    let viewer = member(1).with_permissions([Permission::BasicAccess, Permission::ViewIngame]);
    assert_eq!(h.service.imported_event_detail(&viewer, 900).await.unwrap().event_id, 900);
    assert!(matches!(
        h.service.imported_event_detail(&viewer, 901).await.unwrap_err(),
        OpCalError::NotFound(_)
    ));
}

#[tokio::test]
async fn create_rejects_invalid_drafts() {
    let h = Harness::new().with_filters();
    let author = creator(1);

    let err = h.service.create_event(&member(1), draft("op", at(3, 18)), None).await.unwrap_err();
    assert!(matches!(err, OpCalError::PermissionDenied(_)));

    let err = h.service.create_event(&author, draft("   ", at(3, 18)), None).await.unwrap_err();
    assert!(matches!(err, OpCalError::InvalidInput(_)));

    let mut unknown_filter = draft("op", at(3, 18));
    unknown_filter.visibility_id = Some(42);
    let err = h.service.create_event(&author, unknown_filter, None).await.unwrap_err();
    assert!(matches!(err, OpCalError::InvalidInput(_)));

    h.service.create_event(&author, draft("op", at(3, 18)), None).await.unwrap();
    let err = h.service.create_event(&author, draft("op", at(3, 18)), None).await.unwrap_err();
    assert!(matches!(err, OpCalError::Conflict(_)));
    assert_eq!(h.events.len(), 1);
}

#[tokio::test]
async fn creating_under_announced_filter_notifies_webhook() {
    let h = Harness::new().with_filters();
    let mut announced = draft("Home defense", Utc::now() + Duration::days(1));
    announced.visibility_id = Some(2);

    let event = h.service.create_event(&creator(1), announced, Some(9001)).await.unwrap();

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0.id, 1);
    assert_eq!(sent[0].1.event_id, event.id);
    assert_eq!(sent[0].1.filter_name, "Public");
    assert_eq!(event.created_character, Some(9001));
}

#[tokio::test]
async fn past_event_and_failing_webhook_do_not_block_creation() {
    let h = Harness::new().with_filters();
    let mut past = draft("Yesterday", Utc::now() - Duration::days(1));
    past.visibility_id = Some(2);
    h.service.create_event(&creator(1), past, None).await.unwrap();
    assert!(h.notifier.sent().is_empty());

    h.notifier.fail();
    let mut future = draft("Tomorrow", Utc::now() + Duration::days(1));
    future.visibility_id = Some(2);
    assert!(h.service.create_event(&creator(1), future, None).await.is_ok());
    assert_eq!(h.events.len(), 2);
}

#[tokio::test]
async fn only_owner_or_manager_can_update() {
    let h = Harness::new();
    let event = h.service.create_event(&creator(1), draft("op", at(3, 18)), None).await.unwrap();

    let err = h
        .service
        .update_event(&creator(2), event.id, draft("hijacked", at(3, 18)))
        .await
        .unwrap_err();
    assert!(matches!(err, OpCalError::PermissionDenied(_)));

    let updated = h
        .service
        .update_event(&creator(1), event.id, draft("op (moved)", at(4, 18)))
        .await
        .unwrap();
    assert_eq!(updated.title, "op (moved)");

    // keeping the same title and start is not a conflict with itself
    let updated = h
        .service
        .update_event(&manager(7), event.id, draft("op (moved)", at(4, 18)))
        .await
        .unwrap();
    assert_eq!(updated.start, at(4, 18));
}

#[tokio::test]
async fn delete_requires_manage_permission() {
    let h = Harness::new();
    let event = h.service.create_event(&creator(1), draft("op", at(3, 18)), None).await.unwrap();

    let err = h.service.delete_event(&creator(1), event.id).await.unwrap_err();
    assert!(matches!(err, OpCalError::PermissionDenied(_)));

    h.service.delete_event(&manager(7), event.id).await.unwrap();
    let err = h.service.delete_event(&manager(7), event.id).await.unwrap_err();
    assert!(matches!(err, OpCalError::NotFound(_)));
}

#[tokio::test]
async fn signups_are_unique_and_capped() {
    let h = Harness::new();
    let event = h.service.create_event(&creator(1), draft("op", at(3, 18)), None).await.unwrap();

    h.service.add_member(&member(100), event.id, 100, Some(5)).await.unwrap();
    let err = h.service.add_member(&member(100), event.id, 100, None).await.unwrap_err();
    assert!(matches!(err, OpCalError::Conflict(_)));

    let err = h.service.add_member(&member(100), event.id, 101, None).await.unwrap_err();
    assert!(matches!(err, OpCalError::PermissionDenied(_)));

    for user in 101..110 {
        h.service.add_member(&manager(7), event.id, user, None).await.unwrap();
    }
    let err = h.service.add_member(&member(200), event.id, 200, None).await.unwrap_err();
    assert!(matches!(err, OpCalError::Conflict(_)));

    let view = h.service.event_detail(&member(100), event.id).await.unwrap();
    assert_eq!(view.members.len(), 10);
}
