//! MongoDB implementation of the document repository.
//!
//! Users and events live in typed collections; array state on the event
//! aggregate is mutated with the driver's single-document update operators
//! (`$pull`, `$push`, `$addToSet`, `$set`), each atomic on its own.
//!
//! Unique indexes on `username` and `email` enforce account uniqueness at
//! write time; a duplicate-key rejection surfaces as
//! [`StoreError::Duplicate`] naming the offending field.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, to_bson, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use tracing::info;

use crate::store::{EventFilter, Store, StoreError};
use crate::types::{Event, EventFields, Rsvp, User};

/// MongoDB error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// MongoDB-backed implementation of [`Store`].
#[derive(Clone)]
pub struct MongoStore {
    users: Collection<User>,
    events: Collection<Event>,
}

impl MongoStore {
    /// Connects to the given MongoDB deployment and prepares the collections,
    /// including the unique account indexes.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await.map_err(map_mongo_err)?;
        let db = client.database(database);

        let store = Self {
            users: db.collection::<User>("users"),
            events: db.collection::<Event>("events"),
        };
        store.ensure_indexes().await?;

        info!(database = database, "connected to MongoDB");
        Ok(store)
    }

    /// Creates the unique indexes backing account uniqueness. Safe to run on
    /// every startup; index creation is idempotent.
    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        for keys in [doc! { "username": 1 }, doc! { "email": 1 }] {
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();
            self.users
                .create_index(index, None)
                .await
                .map_err(map_mongo_err)?;
        }
        Ok(())
    }
}

/// Maps a driver error, surfacing unique-index violations as `Duplicate`.
fn map_mongo_err(err: mongodb::error::Error) -> StoreError {
    if let ErrorKind::Write(WriteFailure::WriteError(ref write_err)) = *err.kind {
        if write_err.code == DUPLICATE_KEY_CODE {
            let field = if write_err.message.contains("username") {
                "username"
            } else {
                "email"
            };
            return StoreError::Duplicate(field.to_string());
        }
    }
    StoreError::Backend(err.to_string())
}

fn bson_datetime(at: DateTime<Utc>) -> Result<Bson, StoreError> {
    to_bson(&at).map_err(|err| StoreError::Backend(err.to_string()))
}

fn filter_to_query(filter: &EventFilter) -> Document {
    let mut query = doc! {};
    if let Some(category) = &filter.category {
        query.insert("category", category);
    }
    if let Some(search) = &filter.search {
        let pattern = doc! { "$regex": search, "$options": "i" };
        query.insert(
            "$or",
            vec![
                doc! { "title": pattern.clone() },
                doc! { "description": pattern },
            ],
        );
    }
    query
}

#[async_trait]
impl Store for MongoStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.users
            .insert_one(user, None)
            .await
            .map(|_| ())
            .map_err(map_mongo_err)
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        self.users
            .find_one(doc! { "_id": user_id }, None)
            .await
            .map_err(map_mongo_err)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.users
            .find_one(doc! { "email": email }, None)
            .await
            .map_err(map_mongo_err)
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let filter = doc! {
            "$or": [ { "username": username }, { "email": email } ]
        };
        self.users
            .find_one(filter, None)
            .await
            .map_err(map_mongo_err)
    }

    async fn set_last_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let update = doc! { "$set": { "last_login": bson_datetime(at)? } };
        self.users
            .update_one(doc! { "_id": user_id }, update, None)
            .await
            .map(|_| ())
            .map_err(map_mongo_err)
    }

    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        self.events
            .insert_one(event, None)
            .await
            .map(|_| ())
            .map_err(map_mongo_err)
    }

    async fn find_event(&self, event_id: &str) -> Result<Option<Event>, StoreError> {
        self.events
            .find_one(doc! { "_id": event_id }, None)
            .await
            .map_err(map_mongo_err)
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "date": 1, "created_at": -1 })
            .build();
        let mut cursor = self
            .events
            .find(filter_to_query(filter), options)
            .await
            .map_err(map_mongo_err)?;

        let mut events = Vec::new();
        while let Some(event) = cursor.try_next().await.map_err(map_mongo_err)? {
            events.push(event);
        }
        Ok(events)
    }

    async fn update_event_fields(
        &self,
        event_id: &str,
        fields: &EventFields,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let tags = to_bson(&fields.tags).map_err(|err| StoreError::Backend(err.to_string()))?;
        let update = doc! {
            "$set": {
                "title": &fields.title,
                "description": &fields.description,
                "category": &fields.category,
                "date": &fields.date,
                "time": &fields.time,
                "location": &fields.location,
                "contact_info": &fields.contact_info,
                "max_capacity": fields.max_capacity,
                "tags": tags,
                "updated_at": bson_datetime(updated_at)?,
            }
        };
        let result = self
            .events
            .update_one(doc! { "_id": event_id }, update, None)
            .await
            .map_err(map_mongo_err)?;
        Ok(result.matched_count == 1)
    }

    async fn delete_event(&self, event_id: &str) -> Result<bool, StoreError> {
        let result = self
            .events
            .delete_one(doc! { "_id": event_id }, None)
            .await
            .map_err(map_mongo_err)?;
        Ok(result.deleted_count == 1)
    }

    async fn pull_rsvp(&self, event_id: &str, user_id: &str) -> Result<(), StoreError> {
        let update = doc! { "$pull": { "rsvps": { "user_id": user_id } } };
        self.events
            .update_one(doc! { "_id": event_id }, update, None)
            .await
            .map(|_| ())
            .map_err(map_mongo_err)
    }

    async fn push_rsvp(&self, event_id: &str, rsvp: &Rsvp) -> Result<(), StoreError> {
        let entry = to_bson(rsvp).map_err(|err| StoreError::Backend(err.to_string()))?;
        let update = doc! { "$push": { "rsvps": entry } };
        self.events
            .update_one(doc! { "_id": event_id }, update, None)
            .await
            .map(|_| ())
            .map_err(map_mongo_err)
    }

    async fn set_attendee_counts(
        &self,
        event_id: &str,
        going: u32,
        interested: u32,
    ) -> Result<(), StoreError> {
        let update = doc! {
            "$set": { "attendees_going": going, "attendees_interested": interested }
        };
        self.events
            .update_one(doc! { "_id": event_id }, update, None)
            .await
            .map(|_| ())
            .map_err(map_mongo_err)
    }

    async fn add_favorite(&self, event_id: &str, user_id: &str) -> Result<(), StoreError> {
        let update = doc! { "$addToSet": { "favorites": user_id } };
        self.events
            .update_one(doc! { "_id": event_id }, update, None)
            .await
            .map(|_| ())
            .map_err(map_mongo_err)
    }

    async fn remove_favorite(&self, event_id: &str, user_id: &str) -> Result<(), StoreError> {
        let update = doc! { "$pull": { "favorites": user_id } };
        self.events
            .update_one(doc! { "_id": event_id }, update, None)
            .await
            .map(|_| ())
            .map_err(map_mongo_err)
    }
}
