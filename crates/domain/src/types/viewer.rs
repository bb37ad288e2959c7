//! The user a calendar view is computed for

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::owner::UserId;
use super::permission::Permission;

pub type GroupId = i64;
/// Account tier ("state") identifier.
pub type StateId = i64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub user_id: UserId,
    pub groups: BTreeSet<GroupId>,
    pub state: Option<StateId>,
    pub permissions: BTreeSet<Permission>,
}

impl Viewer {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id, ..Self::default() }
    }

    #[must_use]
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = GroupId>) -> Self {
        self.groups.extend(groups);
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: StateId) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions.extend(permissions);
        self
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}
