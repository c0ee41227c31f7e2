//! User profile repository.
//!
//! Profiles live at `users/{uid}` and carry the user's `role`. The identity
//! gate reads them directly; this repository writes them.

use chrono::Utc;

use boutique_core::{Email, Role, UserId};

use super::RepositoryError;
use crate::backend::{Document, DocumentStore, IdToken, collections};

/// Repository for user profiles.
pub struct ProfileRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Write the profile of a freshly signed-up user with the `user` role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn create(
        &self,
        uid: &UserId,
        email: &Email,
        token: &IdToken,
    ) -> Result<(), RepositoryError> {
        let doc = Document::new(uid.as_str())
            .with("email", email.as_str())
            .with("role", Role::User.as_str())
            .with("createdAt", Utc::now());

        self.store
            .set_document(collections::USERS, uid.as_str(), doc.fields, Some(token))
            .await?;
        Ok(())
    }
}
