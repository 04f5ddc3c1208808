//! Core data model for the Townsquare server.
//!
//! This module defines the stored shapes of users and events, the request
//! bodies accepted over HTTP, and the per-viewer projection of an event.
//!
//! # The event aggregate
//!
//! An [`Event`] embeds its `rsvps` and `favorites` collections; they live and
//! die with the event document and are never stored separately. Those two
//! collections are internal state: responses always go through [`EventView`],
//! which replaces them with the viewer-specific `user_rsvp` and `is_favorited`
//! fields. A viewer can never observe another user's RSVP or favorite.
//!
//! The `attendees_going` / `attendees_interested` counters are a cache of the
//! rsvps array; [`Event::count_rsvps`] recomputes them from the source.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Maximum number of tags on a single event.
pub const MAX_TAGS: usize = 10;

/// Minimum accepted password length at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

// ============================================================================
// Users
// ============================================================================

/// A registered account, as persisted in the users collection.
///
/// `username` and `email` are globally unique; the store rejects duplicates
/// at write time. The password hash is an argon2 PHC string and is never part
/// of any response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

/// Identity of the caller on read endpoints that personalize output.
///
/// Threaded explicitly into listing/projection code instead of an implicit
/// context lookup: a missing or invalid bearer token yields `Anonymous`,
/// never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    /// Authenticated caller with a verified user id.
    Identified(String),
    /// No usable identity was presented.
    Anonymous,
}

impl Viewer {
    /// The viewer's user id, if identified.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Identified(id) => Some(id),
            Self::Anonymous => None,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// RSVP status values a user can hold on an event.
///
/// "Not going" is not a stored state; it is the absence of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    Going,
    Interested,
}

impl RsvpStatus {
    /// The wire representation of this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Going => "going",
            Self::Interested => "interested",
        }
    }
}

/// A single RSVP entry embedded in an event. At most one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rsvp {
    pub user_id: String,
    pub status: RsvpStatus,
}

/// An event aggregate, as persisted in the events collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    /// Calendar date in `YYYY-MM-DD` form. Lexicographic order is date order.
    pub date: String,
    pub time: String,
    pub location: String,
    /// Organizer username, snapshotted at creation. Not updated on rename.
    pub organizer: String,
    /// Owning user reference. Immutable after creation.
    pub organizer_id: String,
    pub contact_info: String,
    pub attendees_going: u32,
    pub attendees_interested: u32,
    pub max_capacity: u32,
    pub tags: Vec<String>,
    #[serde(default)]
    pub rsvps: Vec<Rsvp>,
    #[serde(default)]
    pub favorites: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Creates a fresh event owned by `organizer_id`, with zeroed counters and
    /// empty rsvps/favorites. The caller is responsible for validating
    /// `fields` first.
    #[must_use]
    pub fn new(fields: EventFields, organizer: &str, organizer_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: fields.title,
            description: fields.description,
            category: fields.category,
            date: fields.date,
            time: fields.time,
            location: fields.location,
            organizer: organizer.to_string(),
            organizer_id: organizer_id.to_string(),
            contact_info: fields.contact_info,
            attendees_going: 0,
            attendees_interested: 0,
            max_capacity: fields.max_capacity,
            tags: fields.tags,
            rsvps: Vec::new(),
            favorites: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The RSVP status held by `user_id`, if any.
    pub fn rsvp_of(&self, user_id: &str) -> Option<RsvpStatus> {
        self.rsvps
            .iter()
            .find(|r| r.user_id == user_id)
            .map(|r| r.status)
    }

    /// Recounts (going, interested) from the embedded rsvps array.
    ///
    /// The counters stored on the event are a cache of this computation.
    #[must_use]
    pub fn count_rsvps(&self) -> (u32, u32) {
        let going = self
            .rsvps
            .iter()
            .filter(|r| r.status == RsvpStatus::Going)
            .count() as u32;
        let interested = self
            .rsvps
            .iter()
            .filter(|r| r.status == RsvpStatus::Interested)
            .count() as u32;
        (going, interested)
    }

    /// Projects this event for a viewer.
    ///
    /// The raw rsvps/favorites collections are dropped; only the derived
    /// `user_rsvp` and `is_favorited` fields for this viewer remain.
    #[must_use]
    pub fn to_view(&self, viewer: &Viewer) -> EventView {
        let user_rsvp = viewer
            .user_id()
            .and_then(|id| self.rsvp_of(id))
            .map(|status| status.as_str().to_string())
            .unwrap_or_default();

        let is_favorited = viewer
            .user_id()
            .is_some_and(|id| self.favorites.iter().any(|f| f == id));

        EventView {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            date: self.date.clone(),
            time: self.time.clone(),
            location: self.location.clone(),
            organizer: self.organizer.clone(),
            organizer_id: self.organizer_id.clone(),
            contact_info: self.contact_info.clone(),
            attendees_going: self.attendees_going,
            attendees_interested: self.attendees_interested,
            max_capacity: self.max_capacity,
            tags: self.tags.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            user_rsvp,
            is_favorited,
        }
    }
}

/// The client-facing representation of an event.
///
/// Carries the two viewer-dependent projection fields and none of the
/// embedded per-user collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub organizer: String,
    pub organizer_id: String,
    pub contact_info: String,
    pub attendees_going: u32,
    pub attendees_interested: u32,
    pub max_capacity: u32,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// This viewer's RSVP status: "going", "interested", or "".
    pub user_rsvp: String,
    /// Whether this viewer has favorited the event.
    pub is_favorited: bool,
}

// ============================================================================
// Request bodies
// ============================================================================

/// Editable event fields, shared by create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFields {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub date: String,
    #[serde(default)]
    pub time: String,
    pub location: String,
    #[serde(default)]
    pub contact_info: String,
    #[serde(default)]
    pub max_capacity: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl EventFields {
    /// Validates all field constraints. Runs before any store interaction.
    pub fn validate(&self) -> Result<(), Error> {
        let title_len = self.title.chars().count();
        if !(3..=100).contains(&title_len) {
            return Err(Error::validation("title must be 3-100 characters"));
        }
        if self.description.chars().count() > 2000 {
            return Err(Error::validation("description cannot exceed 2000 characters"));
        }
        if self.category.is_empty() {
            return Err(Error::validation("category is required"));
        }
        if !is_valid_date(&self.date) {
            return Err(Error::validation("date must be in YYYY-MM-DD format"));
        }
        let location_len = self.location.chars().count();
        if location_len == 0 || location_len > 200 {
            return Err(Error::validation("location must be 1-200 characters"));
        }
        if self.contact_info.chars().count() > 100 {
            return Err(Error::validation("contact info cannot exceed 100 characters"));
        }
        if self.tags.len() > MAX_TAGS {
            return Err(Error::validation("cannot have more than 10 tags"));
        }
        Ok(())
    }
}

/// Registration request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    /// Validates registration constraints.
    pub fn validate(&self) -> Result<(), Error> {
        let username_len = self.username.chars().count();
        if !(3..=30).contains(&username_len) {
            return Err(Error::validation("username must be 3-30 characters"));
        }
        if !is_valid_email(&self.email) {
            return Err(Error::validation("email must be a valid email address"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation("password must be at least 8 characters"));
        }
        Ok(())
    }
}

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    /// Validates login constraints.
    pub fn validate(&self) -> Result<(), Error> {
        if !is_valid_email(&self.email) {
            return Err(Error::validation("email must be a valid email address"));
        }
        if self.password.is_empty() {
            return Err(Error::validation("password is required"));
        }
        Ok(())
    }
}

/// RSVP request body. Accepted values: "going", "interested", "not_going", "".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsvpRequest {
    pub rsvp_status: String,
}

/// Favorite request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteRequest {
    pub is_favorited: bool,
}

// ============================================================================
// Response bodies
// ============================================================================

/// Successful register/login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub token: String,
}

/// RSVP mutation acknowledgement. Echoes the requested status verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsvpResponse {
    pub event_id: String,
    pub rsvp_status: String,
}

/// Favorite mutation acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteResponse {
    pub event_id: String,
    pub is_favorited: bool,
}

/// Generic message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Validation helpers
// ============================================================================

/// Checks the `YYYY-MM-DD` shape and that the value is a real calendar date.
fn is_valid_date(date: &str) -> bool {
    date.len() == 10 && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

/// Minimal syntactic email check: one `@`, non-empty local part, and a
/// dotted domain without leading/trailing dots or whitespace.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.') && !domain.contains("..")
}
