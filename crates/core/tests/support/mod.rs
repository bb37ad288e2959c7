//! Shared test helpers for `opcal-core` integration tests.
//!
//! In-memory implementations of every port plus fixtures for owners,
//! credentials and remote events.

#![allow(dead_code)]

pub mod directory;
pub mod feed;
pub mod repositories;

use chrono::{DateTime, Duration, TimeZone, Utc};
use opcal_domain::constants::CALENDAR_READ_SCOPE;
use opcal_domain::{
    CharacterBinding, Corporation, Credential, EventDetail, EventDraft, EventSummary, Owner,
    OwnerErrorState, OwnerId, UserId,
};

pub const CHARACTER_ID: i64 = 90_000_001;
pub const CORPORATION_ID: i64 = 98_000_001;
pub const OWNER_USER: UserId = 5;

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
}

pub fn character(character_id: i64, user_id: UserId) -> CharacterBinding {
    CharacterBinding {
        character_id,
        character_name: format!("Pilot {character_id}"),
        user_id,
    }
}

pub fn corporate_owner(id: OwnerId) -> Owner {
    Owner {
        id,
        corporation: Some(Corporation {
            corporation_id: CORPORATION_ID,
            corporation_name: "Test Corp".into(),
        }),
        character: Some(character(CHARACTER_ID, OWNER_USER)),
        is_active: true,
        last_sync_at: None,
        last_error: OwnerErrorState::None,
    }
}

pub fn personal_owner(id: OwnerId) -> Owner {
    Owner { corporation: None, ..corporate_owner(id) }
}

pub fn credential() -> Credential {
    Credential {
        id: 1,
        character_id: CHARACTER_ID,
        user_id: OWNER_USER,
        access_token: "access".into(),
        refresh_token: Some("refresh".into()),
        scopes: [CALENDAR_READ_SCOPE.to_string()].into(),
        expires_at: Utc::now() + Duration::minutes(20),
    }
}

pub fn summary(event_id: i64, day: u32, title: &str) -> EventSummary {
    EventSummary {
        event_id,
        event_date: at(day, 10),
        title: title.into(),
        importance: 0,
        response: Some("not_responded".into()),
    }
}

pub fn detail(event_id: i64) -> EventDetail {
    EventDetail {
        event_id,
        text: format!("details of {event_id}"),
        owner_id: CORPORATION_ID,
        owner_type: "corporation".into(),
        owner_name: "Test Corp".into(),
        importance: 0,
        duration_minutes: 60,
    }
}

pub fn draft(title: &str, start: DateTime<Utc>) -> EventDraft {
    EventDraft {
        category: None,
        title: title.into(),
        host: "Alliance".into(),
        doctrine: "Shield Ferox".into(),
        formup_system: "1DQ1-A".into(),
        description: String::new(),
        start,
        end: start + Duration::hours(2),
        fc: "FC Pilot".into(),
        visibility_id: None,
        external: false,
    }
}
