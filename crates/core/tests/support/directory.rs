//! Mock user directory and credential store

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use opcal_core::{CredentialStore, CredentialStoreError, UserDirectory};
use opcal_domain::{
    CharacterId, Credential, OpCalError, Permission, Result as DomainResult, UserId, Viewer,
};

/// In-memory `UserDirectory`.
#[derive(Default)]
pub struct MockUserDirectory {
    permissions: Mutex<HashMap<UserId, BTreeSet<Permission>>>,
    characters: Mutex<HashMap<CharacterId, UserId>>,
    failing: Mutex<bool>,
    permission_checks: Mutex<usize>,
}

impl MockUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(self, user_id: UserId, permission: Permission) -> Self {
        self.permissions.lock().unwrap().entry(user_id).or_default().insert(permission);
        self
    }

    pub fn with_character(self, character_id: CharacterId, user_id: UserId) -> Self {
        self.characters.lock().unwrap().insert(character_id, user_id);
        self
    }

    pub fn revoke(&self, user_id: UserId, permission: Permission) {
        if let Some(set) = self.permissions.lock().unwrap().get_mut(&user_id) {
            set.remove(&permission);
        }
    }

    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }

    pub fn permission_checks(&self) -> usize {
        *self.permission_checks.lock().unwrap()
    }

    fn check_available(&self) -> DomainResult<()> {
        if *self.failing.lock().unwrap() {
            Err(OpCalError::Database("directory unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserDirectory for MockUserDirectory {
    async fn has_permission(&self, user_id: UserId, permission: Permission) -> DomainResult<bool> {
        *self.permission_checks.lock().unwrap() += 1;
        self.check_available()?;
        Ok(self
            .permissions
            .lock()
            .unwrap()
            .get(&user_id)
            .is_some_and(|set| set.contains(&permission)))
    }

    async fn load_viewer(&self, user_id: UserId) -> DomainResult<Option<Viewer>> {
        self.check_available()?;
        Ok(self
            .permissions
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|set| Viewer::new(user_id).with_permissions(set.iter().copied())))
    }

    async fn character_owner(&self, character_id: CharacterId) -> DomainResult<Option<UserId>> {
        self.check_available()?;
        Ok(self.characters.lock().unwrap().get(&character_id).copied())
    }
}

/// Scriptable `CredentialStore` holding at most one credential.
#[derive(Default)]
pub struct MockCredentialStore {
    credential: Mutex<Option<Credential>>,
    lookup_error: Mutex<Option<CredentialStoreError>>,
    refresh_error: Mutex<Option<CredentialStoreError>>,
    invalid: Mutex<bool>,
    lookups: Mutex<Vec<(UserId, CharacterId, Vec<String>)>>,
    refreshes: Mutex<usize>,
}

impl MockCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        let store = Self::default();
        *store.credential.lock().unwrap() = Some(credential);
        store
    }

    pub fn fail_lookup(&self, error: CredentialStoreError) {
        *self.lookup_error.lock().unwrap() = Some(error);
    }

    pub fn fail_refresh(&self, error: CredentialStoreError) {
        *self.refresh_error.lock().unwrap() = Some(error);
    }

    pub fn mark_invalid(&self) {
        *self.invalid.lock().unwrap() = true;
    }

    pub fn lookups(&self) -> Vec<(UserId, CharacterId, Vec<String>)> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn refreshes(&self) -> usize {
        *self.refreshes.lock().unwrap()
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn find_credential(
        &self,
        user_id: UserId,
        character_id: CharacterId,
        scopes: &[&str],
    ) -> Result<Option<Credential>, CredentialStoreError> {
        self.lookups.lock().unwrap().push((
            user_id,
            character_id,
            scopes.iter().map(ToString::to_string).collect(),
        ));
        if let Some(err) = self.lookup_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self
            .credential
            .lock()
            .unwrap()
            .clone()
            .filter(|c| c.user_id == user_id && c.character_id == character_id))
    }

    fn is_expired(&self, credential: &Credential) -> bool {
        credential.is_expired_at(Utc::now())
    }

    fn is_invalid(&self, _credential: &Credential) -> bool {
        *self.invalid.lock().unwrap()
    }

    async fn refresh(&self, credential: &Credential) -> Result<Credential, CredentialStoreError> {
        *self.refreshes.lock().unwrap() += 1;
        if let Some(err) = self.refresh_error.lock().unwrap().clone() {
            return Err(err);
        }
        let mut refreshed = credential.clone();
        refreshed.access_token = "refreshed".into();
        refreshed.expires_at = Utc::now() + Duration::minutes(20);
        *self.credential.lock().unwrap() = Some(refreshed.clone());
        Ok(refreshed)
    }
}
