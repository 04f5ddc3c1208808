//! In-memory store for tests and local development.
//!
//! Backed by `RwLock<HashMap>` maps. Each trait method takes the lock exactly
//! once, so the per-operation atomicity matches the document store: a
//! multi-step workflow still interleaves between calls.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::store::{EventFilter, Store, StoreError};
use crate::types::{Event, EventFields, Rsvp, User};

/// Volatile implementation of [`Store`]. Data does not survive a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<String, User>>>,
    events: Arc<RwLock<HashMap<String, Event>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(event: &Event, filter: &EventFilter) -> bool {
    if let Some(category) = &filter.category {
        if &event.category != category {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        let in_title = event.title.to_lowercase().contains(&needle);
        let in_description = event.description.to_lowercase().contains(&needle);
        if !in_title && !in_description {
            return false;
        }
    }
    true
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate("username".to_string()));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.username == username || u.email == email)
            .cloned())
    }

    async fn set_last_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(user_id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        self.events
            .write()
            .await
            .insert(event.id.clone(), event.clone());
        Ok(())
    }

    async fn find_event(&self, event_id: &str) -> Result<Option<Event>, StoreError> {
        Ok(self.events.read().await.get(event_id).cloned())
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>, StoreError> {
        let events = self.events.read().await;
        let mut matched: Vec<Event> = events
            .values()
            .filter(|e| matches_filter(e, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(matched)
    }

    async fn update_event_fields(
        &self,
        event_id: &str,
        fields: &EventFields,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut events = self.events.write().await;
        let Some(event) = events.get_mut(event_id) else {
            return Ok(false);
        };
        event.title = fields.title.clone();
        event.description = fields.description.clone();
        event.category = fields.category.clone();
        event.date = fields.date.clone();
        event.time = fields.time.clone();
        event.location = fields.location.clone();
        event.contact_info = fields.contact_info.clone();
        event.max_capacity = fields.max_capacity;
        event.tags = fields.tags.clone();
        event.updated_at = updated_at;
        Ok(true)
    }

    async fn delete_event(&self, event_id: &str) -> Result<bool, StoreError> {
        Ok(self.events.write().await.remove(event_id).is_some())
    }

    async fn pull_rsvp(&self, event_id: &str, user_id: &str) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        if let Some(event) = events.get_mut(event_id) {
            event.rsvps.retain(|r| r.user_id != user_id);
        }
        Ok(())
    }

    async fn push_rsvp(&self, event_id: &str, rsvp: &Rsvp) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        if let Some(event) = events.get_mut(event_id) {
            event.rsvps.push(rsvp.clone());
        }
        Ok(())
    }

    async fn set_attendee_counts(
        &self,
        event_id: &str,
        going: u32,
        interested: u32,
    ) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        if let Some(event) = events.get_mut(event_id) {
            event.attendees_going = going;
            event.attendees_interested = interested;
        }
        Ok(())
    }

    async fn add_favorite(&self, event_id: &str, user_id: &str) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        if let Some(event) = events.get_mut(event_id) {
            if !event.favorites.iter().any(|f| f == user_id) {
                event.favorites.push(user_id.to_string());
            }
        }
        Ok(())
    }

    async fn remove_favorite(&self, event_id: &str, user_id: &str) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        if let Some(event) = events.get_mut(event_id) {
            event.favorites.retain(|f| f != user_id);
        }
        Ok(())
    }
}
