//! Platform permissions understood by the calendar

use serde::{Deserialize, Serialize};

use crate::impl_codename_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    /// Open the calendar at all.
    BasicAccess,
    ViewPublic,
    ViewMember,
    /// See events mirrored from in-game calendars.
    ViewIngame,
    CreateEvent,
    /// Edit, delete and manage sign-ups of any event.
    ManageEvent,
    /// Register an in-game calendar for syncing; also required on the
    /// syncing character's user at every sync.
    AddIngameCalendarOwner,
}

impl_codename_conversions!(Permission {
    BasicAccess => "opcalendar.basic_access",
    ViewPublic => "opcalendar.view_public",
    ViewMember => "opcalendar.view_member",
    ViewIngame => "opcalendar.view_ingame",
    CreateEvent => "opcalendar.create_event",
    ManageEvent => "opcalendar.manage_event",
    AddIngameCalendarOwner => "opcalendar.add_ingame_calendar_owner",
});

impl Permission {
    pub const ALL: [Self; 7] = [
        Self::BasicAccess,
        Self::ViewPublic,
        Self::ViewMember,
        Self::ViewIngame,
        Self::CreateEvent,
        Self::ManageEvent,
        Self::AddIngameCalendarOwner,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codenames_parse_back() {
        for permission in Permission::ALL {
            let parsed: Permission = permission.to_string().parse().unwrap();
            assert_eq!(parsed, permission);
        }
    }

    #[test]
    fn sync_permission_codename() {
        assert_eq!(
            Permission::AddIngameCalendarOwner.to_string(),
            "opcalendar.add_ingame_calendar_owner"
        );
    }
}
