//! Per-viewer visibility of calendar entries.
//!
//! Everything here is pure and lock-free; call it from any number of
//! concurrent requests.
//!
//! Local events:
//! - no filter attached: visible to everyone
//! - inactive filter: treated as no filter
//! - otherwise visible iff (no group restriction OR viewer in an authorized
//!   group) AND (no tier restriction OR viewer's tier authorized)
//!
//! Imported events ignore filters and only need [`Permission::ViewIngame`].

use chrono::{DateTime, Utc};
use opcal_domain::{
    CalendarEntry, LocalEvent, Permission, Viewer, VisibilityFilter, WebHookId,
};

/// Whether `filter` lets `viewer` see the events it is attached to.
pub fn admits(filter: &VisibilityFilter, viewer: &Viewer) -> bool {
    if !filter.is_active {
        return true;
    }

    let group_ok = filter.groups.is_empty() || !filter.groups.is_disjoint(&viewer.groups);
    let state_ok = filter.states.is_empty()
        || viewer.state.is_some_and(|state| filter.states.contains(&state));

    group_ok && state_ok
}

pub fn is_visible(entry: &CalendarEntry, viewer: &Viewer) -> bool {
    match entry {
        CalendarEntry::Local(event) => local_event_visible(event, viewer),
        CalendarEntry::Imported(_) => viewer.has(Permission::ViewIngame),
    }
}

pub fn local_event_visible(event: &LocalEvent, viewer: &Viewer) -> bool {
    event.visibility.as_ref().map_or(true, |filter| admits(filter, viewer))
}

/// Entries of `candidates` the viewer may see, in input order.
pub fn visible_events<I>(viewer: &Viewer, candidates: I) -> Vec<CalendarEntry>
where
    I: IntoIterator<Item = CalendarEntry>,
{
    candidates.into_iter().filter(|entry| is_visible(entry, viewer)).collect()
}

/// Managers edit anything; creators edit their own events while they still
/// hold the create permission.
pub fn can_edit(viewer: &Viewer, event: &LocalEvent) -> bool {
    viewer.has(Permission::ManageEvent)
        || (event.created_by == viewer.user_id && viewer.has(Permission::CreateEvent))
}

/// Webhook to inform about a new event under `filter`, if any.
///
/// Past events are skipped when the filter has `ignore_past` set.
pub fn notification_target(
    filter: &VisibilityFilter,
    event_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<WebHookId> {
    if !filter.is_active {
        return None;
    }
    if filter.ignore_past && event_start < now {
        return None;
    }
    filter.webhook_id
}
