//! Port interfaces for the credential (token) store

use async_trait::async_trait;
use opcal_domain::{CharacterId, Credential, UserId};
use thiserror::Error;

/// Failures reported by a credential store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialStoreError {
    /// The credential was revoked or can no longer be used.
    #[error("credential is invalid: {0}")]
    Invalid(String),

    /// The credential expired and the store could not renew it.
    #[error("credential expired: {0}")]
    Expired(String),

    /// The store itself could not be reached.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Store of scoped, expiring credentials for linked characters.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Best credential of `user_id` for `character_id` granting every scope
    /// in `scopes`, or `None` when no such credential exists.
    async fn find_credential(
        &self,
        user_id: UserId,
        character_id: CharacterId,
        scopes: &[&str],
    ) -> Result<Option<Credential>, CredentialStoreError>;

    fn is_expired(&self, credential: &Credential) -> bool;

    fn is_invalid(&self, credential: &Credential) -> bool;

    /// Silently renew an expired credential.
    async fn refresh(&self, credential: &Credential) -> Result<Credential, CredentialStoreError>;
}
