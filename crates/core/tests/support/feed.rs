//! Scriptable remote calendar

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use opcal_core::{FeedError, RemoteCalendarFeed};
use opcal_domain::{CharacterId, Credential, EventDetail, EventSummary};

use super::detail;

/// `RemoteCalendarFeed` serving a fixed listing.
///
/// Details are generated from the event id unless overridden. Failures and a
/// per-call delay can be injected to exercise aborts and timeouts.
#[derive(Default)]
pub struct MockFeed {
    listing: Mutex<Vec<EventSummary>>,
    details: Mutex<HashMap<i64, EventDetail>>,
    list_error: Mutex<Option<FeedError>>,
    detail_errors: Mutex<HashMap<i64, FeedError>>,
    delay: Mutex<Option<Duration>>,
    detail_calls: Mutex<Vec<i64>>,
    list_calls: Mutex<usize>,
}

impl MockFeed {
    pub fn new(listing: Vec<EventSummary>) -> Self {
        let feed = Self::default();
        feed.set_listing(listing);
        feed
    }

    pub fn set_listing(&self, listing: Vec<EventSummary>) {
        *self.listing.lock().unwrap() = listing;
    }

    pub fn set_detail(&self, detail: EventDetail) {
        self.details.lock().unwrap().insert(detail.event_id, detail);
    }

    pub fn fail_listing(&self, error: FeedError) {
        *self.list_error.lock().unwrap() = Some(error);
    }

    pub fn fail_detail(&self, event_id: i64, error: FeedError) {
        self.detail_errors.lock().unwrap().insert(event_id, error);
    }

    pub fn clear_failures(&self) {
        *self.list_error.lock().unwrap() = None;
        self.detail_errors.lock().unwrap().clear();
    }

    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn detail_calls(&self) -> Vec<i64> {
        self.detail_calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RemoteCalendarFeed for MockFeed {
    async fn list_events(
        &self,
        _character_id: CharacterId,
        _credential: &Credential,
    ) -> Result<Vec<EventSummary>, FeedError> {
        *self.list_calls.lock().unwrap() += 1;
        self.pause().await;
        if let Some(err) = self.list_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.listing.lock().unwrap().clone())
    }

    async fn get_event_detail(
        &self,
        _character_id: CharacterId,
        event_id: i64,
        _credential: &Credential,
    ) -> Result<EventDetail, FeedError> {
        self.detail_calls.lock().unwrap().push(event_id);
        self.pause().await;
        if let Some(err) = self.detail_errors.lock().unwrap().get(&event_id).cloned() {
            return Err(err);
        }
        Ok(self.details.lock().unwrap().get(&event_id).cloned().unwrap_or_else(|| detail(event_id)))
    }
}
