//! Resolves a usable credential for an owner before a sync.
//!
//! Checks run in a fixed order and the first failing check decides the
//! outcome:
//!
//! 1. the owner has a linked character ([`OwnerErrorState::NoCharacter`])
//! 2. corporate owners: the character's user may sync corporation calendars
//! 3. the character's user may sync calendars at all
//!    ([`OwnerErrorState::InsufficientPermissions`] for either gate)
//! 4. a credential with the required scopes exists and is usable
//!    ([`OwnerErrorState::TokenInvalid`] / [`OwnerErrorState::TokenExpired`];
//!    a failing store is [`OwnerErrorState::Unknown`])
//!
//! Resolution never mutates local state and can be retried freely.

use std::sync::Arc;

use opcal_domain::{CharacterBinding, Credential, Owner, OwnerErrorState, Permission};
use tracing::{debug, error, instrument, warn};

use super::ports::{CredentialStore, CredentialStoreError};
use crate::user::ports::UserDirectory;

pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
    directory: Arc<dyn UserDirectory>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn CredentialStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { store, directory }
    }

    /// Returns a valid credential for `owner` covering `scopes`, or the state
    /// explaining why none is available.
    #[instrument(skip(self, owner), fields(owner_id = owner.id, stage = "credential"))]
    pub async fn resolve(
        &self,
        owner: &Owner,
        scopes: &[&str],
    ) -> Result<Credential, OwnerErrorState> {
        let Some(character) = owner.character.as_ref() else {
            error!(owner_id = owner.id, owner = %owner.label(), "no character configured to sync");
            return Err(OwnerErrorState::NoCharacter);
        };

        if owner.is_corporate() {
            self.require_sync_permission(owner, character, "corporation").await?;
        }
        self.require_sync_permission(owner, character, "personal").await?;

        let found = self
            .store
            .find_credential(character.user_id, character.character_id, scopes)
            .await
            .map_err(|err| lookup_failure(owner, &err))?;

        let Some(credential) = found else {
            error!(owner_id = owner.id, "no token found with sufficient scopes");
            return Err(OwnerErrorState::TokenInvalid);
        };

        if !credential.covers(scopes) || self.store.is_invalid(&credential) {
            error!(owner_id = owner.id, credential_id = credential.id, "invalid token for fetching calendars");
            return Err(OwnerErrorState::TokenInvalid);
        }

        if !self.store.is_expired(&credential) {
            return Ok(credential);
        }

        debug!(owner_id = owner.id, credential_id = credential.id, "token expired, refreshing");
        self.store.refresh(&credential).await.map_err(|err| {
            let state = classify(&err);
            error!(owner_id = owner.id, error_state = state.label(), error = %err, "token refresh failed");
            state
        })
    }

    async fn require_sync_permission(
        &self,
        owner: &Owner,
        character: &CharacterBinding,
        gate: &'static str,
    ) -> Result<(), OwnerErrorState> {
        match self
            .directory
            .has_permission(character.user_id, Permission::AddIngameCalendarOwner)
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!(
                    owner_id = owner.id,
                    user_id = character.user_id,
                    gate,
                    "character lacks permission to sync calendars"
                );
                Err(OwnerErrorState::InsufficientPermissions)
            }
            Err(err) => {
                error!(
                    owner_id = owner.id,
                    gate,
                    error_state = OwnerErrorState::Unknown.label(),
                    error = %err,
                    "permission lookup failed"
                );
                Err(OwnerErrorState::Unknown)
            }
        }
    }
}

/// Store failures are local faults, not token problems.
fn classify(err: &CredentialStoreError) -> OwnerErrorState {
    match err {
        CredentialStoreError::Invalid(_) => OwnerErrorState::TokenInvalid,
        CredentialStoreError::Expired(_) => OwnerErrorState::TokenExpired,
        CredentialStoreError::Unavailable(_) => OwnerErrorState::Unknown,
    }
}

fn lookup_failure(owner: &Owner, err: &CredentialStoreError) -> OwnerErrorState {
    let state = classify(err);
    error!(owner_id = owner.id, error_state = state.label(), error = %err, "credential lookup failed");
    state
}
