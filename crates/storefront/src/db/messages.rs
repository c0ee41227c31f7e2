//! Contact message repository.

use chrono::Utc;

use boutique_core::MessageId;

use super::RepositoryError;
use crate::backend::{Document, DocumentStore, IdToken, collections};
use crate::models::{Message, NewMessage};

/// Repository for contact-form messages.
pub struct MessageRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> MessageRepository<'a> {
    /// Create a new message repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Store a message. Visitors need not be signed in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn create(
        &self,
        message: NewMessage,
        token: Option<&IdToken>,
    ) -> Result<MessageId, RepositoryError> {
        let doc = Document::default()
            .with("name", message.name)
            .with("email", message.email.into_inner())
            .with("message", message.body)
            .with("createdAt", Utc::now());

        let created = self
            .store
            .create_document(collections::MESSAGES, doc.fields, token)
            .await?;
        Ok(MessageId::new(created.id))
    }

    /// Every message, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be read.
    pub async fn list(&self, token: &IdToken) -> Result<Vec<Message>, RepositoryError> {
        let documents = self
            .store
            .list_documents(collections::MESSAGES, Some(token))
            .await?;

        let mut messages: Vec<Message> = documents.iter().map(message_from_document).collect();
        // `None` sorts first, so reversing puts undated messages last.
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }

    /// Number of stored messages.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be read.
    pub async fn count(&self, token: &IdToken) -> Result<usize, RepositoryError> {
        Ok(self
            .store
            .list_documents(collections::MESSAGES, Some(token))
            .await?
            .len())
    }
}

/// Messages are free text; missing fields read as empty.
fn message_from_document(doc: &Document) -> Message {
    let text = |field: &str| doc.string(field).unwrap_or_default().to_owned();
    Message {
        id: MessageId::new(doc.id.as_str()),
        name: text("name"),
        email: text("email"),
        body: text("message"),
        created_at: doc.timestamp("createdAt"),
    }
}
