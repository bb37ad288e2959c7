//! Owner sync behaviour of the reconciliation engine.

mod support;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use opcal_core::{CredentialResolver, FeedError, ReconciliationEngine, SyncStage};
use opcal_domain::{ImportedEvent, OwnerErrorState, Permission};
use support::directory::{MockCredentialStore, MockUserDirectory};
use support::feed::MockFeed;
use support::repositories::InMemoryImportedEvents;
use support::{at, corporate_owner, credential, detail, summary, OWNER_USER};

struct Harness {
    feed: Arc<MockFeed>,
    events: Arc<InMemoryImportedEvents>,
    directory: Arc<MockUserDirectory>,
    engine: ReconciliationEngine,
}

impl Harness {
    fn new(feed: MockFeed) -> Self {
        let feed = Arc::new(feed);
        let events = Arc::new(InMemoryImportedEvents::new());
        let directory = Arc::new(
            MockUserDirectory::new().grant(OWNER_USER, Permission::AddIngameCalendarOwner),
        );
        let store = Arc::new(MockCredentialStore::with_credential(credential()));
        let resolver = Arc::new(CredentialResolver::new(store, directory.clone()));
        let engine = ReconciliationEngine::new(resolver, feed.clone(), events.clone());
        Self { feed, events, directory, engine }
    }

    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.engine = self.engine.with_remote_timeout(timeout);
        self
    }

    fn ids(&self) -> BTreeSet<i64> {
        self.events.ids(1).into_iter().collect()
    }
}

fn cached(event_id: i64, day: u32, title: &str) -> ImportedEvent {
    ImportedEvent::from_remote(1, &summary(event_id, day, title), &detail(event_id))
}

#[tokio::test]
async fn new_event_is_imported_next_to_cached_one() {
    // Arrange
    let harness = Harness::new(MockFeed::new(vec![
        summary(101, 1, "Mining Op"),
        summary(102, 2, "Fleet Ops"),
    ]));
    let original = cached(101, 1, "Mining Op");
    harness.events.seed(original.clone());

    // Act
    let report = harness.engine.sync_with_report(&corporate_owner(1)).await;

    // Assert
    assert_eq!(report.state, OwnerErrorState::None);
    assert_eq!((report.created, report.retained, report.deleted), (1, 1, 0));
    assert_eq!(harness.events.row(1, 101), Some(original));

    let created = harness.events.row(1, 102).unwrap();
    assert_eq!(created.title, "Fleet Ops");
    assert_eq!(created.start, at(2, 10));
    assert_eq!(created.end, Some(at(2, 11)));
    assert_eq!(harness.feed.detail_calls(), vec![102]);
}

#[tokio::test]
async fn unlisted_event_is_purged() {
    let harness = Harness::new(MockFeed::new(vec![summary(102, 2, "Fleet Ops")]));
    harness.events.seed(cached(101, 1, "Mining Op"));
    harness.events.seed(cached(102, 2, "Fleet Ops"));

    let report = harness.engine.sync_with_report(&corporate_owner(1)).await;

    assert_eq!(report.state, OwnerErrorState::None);
    assert_eq!(report.deleted, 1);
    assert_eq!(harness.ids(), BTreeSet::from([102]));
    assert!(harness.feed.detail_calls().is_empty());
}

#[tokio::test]
async fn second_sync_changes_nothing() {
    let harness = Harness::new(MockFeed::new(vec![
        summary(1, 3, "A"),
        summary(2, 4, "B"),
        summary(3, 5, "C"),
    ]));
    let owner = corporate_owner(1);

    harness.engine.sync(&owner).await;
    let creates = harness.events.creates();
    let detail_calls = harness.feed.detail_calls().len();

    let report = harness.engine.sync_with_report(&owner).await;

    assert_eq!(report.state, OwnerErrorState::None);
    assert_eq!((report.created, report.retained, report.deleted), (0, 3, 0));
    assert_eq!(harness.events.creates(), creates);
    assert_eq!(harness.events.deletes(), 0);
    assert_eq!(harness.feed.detail_calls().len(), detail_calls);
}

#[tokio::test]
async fn cache_converges_to_remote_set() {
    let harness = Harness::new(MockFeed::new(
        [2, 4, 6, 8].iter().map(|id| summary(*id, 10, &format!("event {id}"))).collect(),
    ));
    for id in [1, 2, 3, 4] {
        harness.events.seed(cached(id, 9, &format!("old {id}")));
    }

    let report = harness.engine.sync_with_report(&corporate_owner(1)).await;

    assert_eq!(report.state, OwnerErrorState::None);
    assert_eq!(harness.ids(), BTreeSet::from([2, 4, 6, 8]));
    assert_eq!((report.created, report.retained, report.deleted), (2, 2, 2));
    // matched events keep their cached fields
    assert_eq!(harness.events.row(1, 2).unwrap().title, "old 2");
}

#[tokio::test]
async fn empty_listing_purges_everything() {
    let harness = Harness::new(MockFeed::new(Vec::new()));
    harness.events.seed(cached(101, 1, "Mining Op"));

    let report = harness.engine.sync_with_report(&corporate_owner(1)).await;

    assert_eq!(report.state, OwnerErrorState::None);
    assert!(harness.ids().is_empty());
}

#[tokio::test]
async fn duplicate_listing_entry_is_imported_once() {
    let harness = Harness::new(MockFeed::new(vec![
        summary(7, 1, "Dup"),
        summary(7, 1, "Dup"),
    ]));

    let report = harness.engine.sync_with_report(&corporate_owner(1)).await;

    assert_eq!(report.created, 1);
    assert_eq!(harness.feed.detail_calls(), vec![7]);
}

#[tokio::test]
async fn detail_failure_keeps_earlier_creates_and_skips_purge() {
    // Arrange
    let harness = Harness::new(MockFeed::new(vec![
        summary(201, 1, "first"),
        summary(202, 2, "second"),
        summary(203, 3, "third"),
    ]));
    harness.events.seed(cached(100, 1, "stale"));
    harness.feed.fail_detail(203, FeedError::Unavailable("502 Bad Gateway".into()));

    // Act
    let report = harness.engine.sync_with_report(&corporate_owner(1)).await;

    // Assert
    assert_eq!(report.state, OwnerErrorState::RemoteUnavailable);
    assert_eq!(report.stage, Some(SyncStage::Detail));
    assert_eq!(report.created, 2);
    assert_eq!(harness.ids(), BTreeSet::from([100, 201, 202]));
    assert_eq!(harness.events.deletes(), 0);

    // the next run resumes without duplicates
    harness.feed.clear_failures();
    let report = harness.engine.sync_with_report(&corporate_owner(1)).await;
    assert_eq!(report.state, OwnerErrorState::None);
    assert_eq!(report.created, 1);
    assert_eq!(harness.ids(), BTreeSet::from([201, 202, 203]));
}

#[tokio::test]
async fn listing_failures_leave_cache_untouched() {
    let cases = [
        (FeedError::Unauthorized("401".into()), OwnerErrorState::TokenInvalid),
        (FeedError::Forbidden("403".into()), OwnerErrorState::InsufficientPermissions),
        (FeedError::Unavailable("503".into()), OwnerErrorState::RemoteUnavailable),
        (FeedError::Unexpected("bad json".into()), OwnerErrorState::Unknown),
    ];

    for (error, expected) in cases {
        let harness = Harness::new(MockFeed::new(Vec::new()));
        harness.events.seed(cached(101, 1, "Mining Op"));
        harness.feed.fail_listing(error);

        let report = harness.engine.sync_with_report(&corporate_owner(1)).await;

        assert_eq!(report.state, expected);
        assert_eq!(report.stage, Some(SyncStage::Listing));
        assert_eq!(harness.ids(), BTreeSet::from([101]));
    }
}

#[tokio::test]
async fn slow_remote_counts_as_unavailable() {
    let harness = Harness::new(MockFeed::new(vec![summary(1, 1, "slow")]))
        .with_timeout(Duration::from_millis(50));
    harness.feed.delay(Duration::from_millis(500));

    let report = harness.engine.sync_with_report(&corporate_owner(1)).await;

    assert_eq!(report.state, OwnerErrorState::RemoteUnavailable);
    assert_eq!(report.stage, Some(SyncStage::Listing));
    assert_eq!(harness.events.len(), 0);
}

#[tokio::test]
async fn inactive_owner_is_a_no_op() {
    let harness = Harness::new(MockFeed::new(vec![summary(1, 1, "A")]));
    let mut owner = corporate_owner(1);
    owner.is_active = false;

    let state = harness.engine.sync(&owner).await;

    assert_eq!(state, OwnerErrorState::None);
    assert_eq!(harness.feed.list_calls(), 0);
    assert_eq!(harness.events.len(), 0);
}

#[tokio::test]
async fn credential_failure_aborts_before_remote_calls() {
    let harness = Harness::new(MockFeed::new(vec![summary(1, 1, "A")]));
    harness.directory.revoke(OWNER_USER, Permission::AddIngameCalendarOwner);

    let report = harness.engine.sync_with_report(&corporate_owner(1)).await;

    assert_eq!(report.state, OwnerErrorState::InsufficientPermissions);
    assert_eq!(report.stage, Some(SyncStage::Credential));
    assert_eq!(harness.feed.list_calls(), 0);
}

#[tokio::test]
async fn storage_failures_are_unknown() {
    let harness = Harness::new(MockFeed::new(vec![summary(1, 1, "A")]));
    harness.events.fail_snapshot();
    let report = harness.engine.sync_with_report(&corporate_owner(1)).await;
    assert_eq!((report.state, report.stage), (OwnerErrorState::Unknown, Some(SyncStage::Snapshot)));

    let harness = Harness::new(MockFeed::new(vec![summary(1, 1, "A")]));
    harness.events.fail_create();
    let report = harness.engine.sync_with_report(&corporate_owner(1)).await;
    assert_eq!((report.state, report.stage), (OwnerErrorState::Unknown, Some(SyncStage::Persist)));

    let harness = Harness::new(MockFeed::new(Vec::new()));
    harness.events.seed(cached(5, 1, "stale"));
    harness.events.fail_delete();
    let report = harness.engine.sync_with_report(&corporate_owner(1)).await;
    assert_eq!((report.state, report.stage), (OwnerErrorState::Unknown, Some(SyncStage::Purge)));
}

#[tokio::test]
async fn owners_do_not_share_cache_entries() {
    let harness = Harness::new(MockFeed::new(vec![summary(101, 1, "shared")]));
    let mut other = cached(999, 1, "other owner");
    other.owner_id = 2;
    harness.events.seed(other);

    harness.engine.sync(&corporate_owner(1)).await;

    assert_eq!(harness.ids(), BTreeSet::from([101]));
    assert_eq!(harness.events.ids(2), vec![999]);
}
