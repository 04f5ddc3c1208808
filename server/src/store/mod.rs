//! Document repository seam.
//!
//! The [`Store`] trait is the boundary between the workflows and the
//! persistence layer. It exposes exactly the operations the workflows need,
//! each atomic at single-document granularity:
//!
//! - whole-document insert/find/delete for users and events
//! - field-set updates (`update_event_fields`, `set_attendee_counts`,
//!   `set_last_login`)
//! - array mutations on the event aggregate (`pull_rsvp`, `push_rsvp`,
//!   `add_favorite`, `remove_favorite`)
//!
//! Workflows that issue several of these calls in sequence (the RSVP
//! protocol) are not atomic as a whole; see the `events` module for the
//! consistency model.
//!
//! Two implementations exist: [`MongoStore`] for production and
//! [`MemoryStore`] for tests and local development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{Event, EventFields, Rsvp, User};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Errors surfaced by a store implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A write violated a unique constraint; the payload names the field.
    #[error("duplicate value for unique field '{0}'")]
    Duplicate(String),

    /// Any other backend failure. Fatal for the request; never retried.
    #[error("{0}")]
    Backend(String),
}

/// Query filter for event listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Exact category match.
    pub category: Option<String>,
    /// Case-insensitive substring match against title or description.
    pub search: Option<String>,
}

/// The document repository: two collections, atomic per-document operations.
#[async_trait]
pub trait Store: Send + Sync {
    // ------------------------------------------------------------------ users

    /// Persists a new user. Rejects duplicate usernames or emails with
    /// [`StoreError::Duplicate`].
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Single query matching either unique field, used by the registration
    /// pre-check.
    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Sets the last-login timestamp. A no-op if the user is missing.
    async fn set_last_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    // ----------------------------------------------------------------- events

    async fn insert_event(&self, event: &Event) -> Result<(), StoreError>;

    async fn find_event(&self, event_id: &str) -> Result<Option<Event>, StoreError>;

    /// Events matching `filter`, ordered by date ascending, then creation
    /// time descending.
    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>, StoreError>;

    /// Replaces all editable fields in one atomic update and stamps
    /// `updated_at`. Returns `false` when the event is missing. Never touches
    /// organizer, rsvps, favorites, or counters.
    async fn update_event_fields(
        &self,
        event_id: &str,
        fields: &EventFields,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Removes the event document and everything embedded in it. Returns
    /// `false` when the event is missing.
    async fn delete_event(&self, event_id: &str) -> Result<bool, StoreError>;

    // ----------------------------------------------------- event array fields

    /// Removes any rsvp entry held by `user_id`. Idempotent.
    async fn pull_rsvp(&self, event_id: &str, user_id: &str) -> Result<(), StoreError>;

    /// Appends an rsvp entry. Callers maintain the one-entry-per-user rule
    /// by pulling first.
    async fn push_rsvp(&self, event_id: &str, rsvp: &Rsvp) -> Result<(), StoreError>;

    /// Overwrites both attendee counters.
    async fn set_attendee_counts(
        &self,
        event_id: &str,
        going: u32,
        interested: u32,
    ) -> Result<(), StoreError>;

    /// Adds `user_id` to the favorites set. Idempotent.
    async fn add_favorite(&self, event_id: &str, user_id: &str) -> Result<(), StoreError>;

    /// Removes `user_id` from the favorites set. Idempotent.
    async fn remove_favorite(&self, event_id: &str, user_id: &str) -> Result<(), StoreError>;
}
