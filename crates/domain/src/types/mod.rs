//! Domain types and models

pub mod calendar;
pub mod credential;
pub mod imported;
pub mod local_event;
pub mod owner;
pub mod permission;
pub mod viewer;
pub mod visibility;

pub use calendar::{CalendarEntry, MonthCursor};
pub use credential::Credential;
pub use imported::{EventDetail, EventSummary, ImportedEvent};
pub use local_event::{
    EventCategory, EventDraft, EventMember, LocalEvent, LocalEventId, NewLocalEvent,
};
pub use owner::{
    CharacterBinding, CharacterId, Corporation, CorporationId, Owner, OwnerErrorState, OwnerId,
    OwnerRegistration, UserId,
};
pub use permission::Permission;
pub use viewer::{GroupId, StateId, Viewer};
pub use visibility::{EventNotification, VisibilityFilter, VisibilityFilterId, WebHook, WebHookId};
