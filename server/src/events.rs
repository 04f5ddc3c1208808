//! Event workflow: creation, queries, ownership, RSVPs, favorites.
//!
//! # Consistency model
//!
//! The embedded `rsvps` array is the canonical source of attendance state;
//! `attendees_going` / `attendees_interested` are a cache of it. Every RSVP
//! write recomputes both counters from the array rather than incrementing
//! them.
//!
//! [`set_rsvp`] issues four store operations in sequence (pull the caller's
//! entry, re-read and recount, push the new entry, set the counters), each
//! atomic on its own but not as a whole. Two concurrent calls for different
//! users on the same event can interleave so that one call's counter write
//! clobbers the other's; the next completed RSVP repairs the counters from
//! the array. No locks or retries are layered on top of the store.
//!
//! # Authorization
//!
//! Events are exclusively owned by their creator. Only the owner may update
//! or delete; the organizer reference and `created_at` are immutable. The
//! existence check runs before the ownership check, so an unknown id is
//! always `NotFound` and a known-but-foreign id is always `Forbidden`.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::store::{EventFilter, Store};
use crate::types::{
    Event, EventFields, EventView, FavoriteResponse, Rsvp, RsvpResponse, RsvpStatus, Viewer,
};

/// RSVP statuses accepted on the wire. "not_going" and "" clear the RSVP.
const ACCEPTED_RSVP_STATUSES: [&str; 4] = ["going", "interested", "not_going", ""];

fn event_not_found() -> Error {
    Error::not_found("event not found")
}

/// Lists events matching `filter`, projected for `viewer`.
///
/// Ordered by event date ascending, then creation time descending.
pub async fn list_events(
    store: &dyn Store,
    filter: &EventFilter,
    viewer: &Viewer,
) -> Result<Vec<EventView>> {
    let events = store.list_events(filter).await?;
    debug!(count = events.len(), "listed events");
    Ok(events.iter().map(|event| event.to_view(viewer)).collect())
}

/// Fetches a single event, projected for `viewer`.
pub async fn get_event(store: &dyn Store, event_id: &str, viewer: &Viewer) -> Result<EventView> {
    let event = store
        .find_event(event_id)
        .await?
        .ok_or_else(event_not_found)?;
    Ok(event.to_view(viewer))
}

/// Creates an event owned by `owner_id`.
///
/// The owner's current username is snapshotted into the organizer field and
/// never updated retroactively. The fresh event carries zero counters and no
/// RSVPs or favorites, including none for its creator.
pub async fn create_event(
    store: &dyn Store,
    fields: EventFields,
    owner_id: &str,
) -> Result<EventView> {
    fields.validate()?;

    let owner = store
        .find_user_by_id(owner_id)
        .await?
        .ok_or_else(|| Error::auth("user not found"))?;

    let event = Event::new(fields, &owner.username, &owner.id);
    store.insert_event(&event).await?;
    info!(event_id = %event.id, organizer_id = %owner.id, "event created");

    Ok(event.to_view(&Viewer::Identified(owner.id)))
}

/// Replaces the editable fields of an event owned by `caller_id`.
///
/// Embedded RSVPs, favorites, and counters are untouched.
pub async fn update_event(
    store: &dyn Store,
    event_id: &str,
    fields: EventFields,
    caller_id: &str,
) -> Result<()> {
    fields.validate()?;

    let event = store
        .find_event(event_id)
        .await?
        .ok_or_else(event_not_found)?;
    if event.organizer_id != caller_id {
        return Err(Error::forbidden("you can only edit your own events"));
    }

    let updated = store
        .update_event_fields(event_id, &fields, Utc::now())
        .await?;
    if !updated {
        // Deleted between the ownership check and the write.
        return Err(event_not_found());
    }
    info!(event_id = %event_id, "event updated");
    Ok(())
}

/// Deletes an event owned by `caller_id`, along with all embedded RSVP and
/// favorite state.
pub async fn delete_event(store: &dyn Store, event_id: &str, caller_id: &str) -> Result<()> {
    let event = store
        .find_event(event_id)
        .await?
        .ok_or_else(event_not_found)?;
    if event.organizer_id != caller_id {
        return Err(Error::forbidden("you can only delete your own events"));
    }

    store.delete_event(event_id).await?;
    info!(event_id = %event_id, "event deleted");
    Ok(())
}

/// Sets (or clears) the caller's RSVP on an event and recomputes the
/// attendee counters.
///
/// `status` must be "going", "interested", "not_going", or ""; the last two
/// both mean "no RSVP". The requested status is echoed back verbatim.
pub async fn set_rsvp(
    store: &dyn Store,
    event_id: &str,
    caller_id: &str,
    status: &str,
) -> Result<RsvpResponse> {
    if !ACCEPTED_RSVP_STATUSES.contains(&status) {
        return Err(Error::validation("invalid RSVP status"));
    }

    store
        .find_event(event_id)
        .await?
        .ok_or_else(event_not_found)?;

    // Step 1: drop any existing entry for this caller.
    store.pull_rsvp(event_id, caller_id).await?;

    // Step 2: re-read and recount from the canonical array.
    let event = store
        .find_event(event_id)
        .await?
        .ok_or_else(event_not_found)?;
    let (mut going, mut interested) = event.count_rsvps();

    // Step 3: insert the new entry, if the status holds one.
    match status {
        "going" => {
            let rsvp = Rsvp {
                user_id: caller_id.to_string(),
                status: RsvpStatus::Going,
            };
            store.push_rsvp(event_id, &rsvp).await?;
            going += 1;
        }
        "interested" => {
            let rsvp = Rsvp {
                user_id: caller_id.to_string(),
                status: RsvpStatus::Interested,
            };
            store.push_rsvp(event_id, &rsvp).await?;
            interested += 1;
        }
        _ => {}
    }

    // Step 4: persist the recomputed counters.
    store
        .set_attendee_counts(event_id, going, interested)
        .await?;

    debug!(
        event_id = %event_id,
        user_id = %caller_id,
        status = %status,
        attendees_going = going,
        attendees_interested = interested,
        "rsvp updated"
    );

    Ok(RsvpResponse {
        event_id: event_id.to_string(),
        rsvp_status: status.to_string(),
    })
}

/// Adds or removes the caller from an event's favorites set.
///
/// Both directions are idempotent.
pub async fn set_favorite(
    store: &dyn Store,
    event_id: &str,
    caller_id: &str,
    is_favorited: bool,
) -> Result<FavoriteResponse> {
    store
        .find_event(event_id)
        .await?
        .ok_or_else(event_not_found)?;

    if is_favorited {
        store.add_favorite(event_id, caller_id).await?;
    } else {
        store.remove_favorite(event_id, caller_id).await?;
    }

    debug!(
        event_id = %event_id,
        user_id = %caller_id,
        is_favorited = is_favorited,
        "favorite updated"
    );

    Ok(FavoriteResponse {
        event_id: event_id.to_string(),
        is_favorited,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::User;

    async fn seed_user(store: &MemoryStore, username: &str) -> User {
        let user = User {
            id: format!("user-{username}"),
            username: username.to_string(),
            email: format!("{username}@x.com"),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
            last_login: None,
        };
        store.insert_user(&user).await.unwrap();
        user
    }

    fn fields(title: &str, date: &str) -> EventFields {
        EventFields {
            title: title.to_string(),
            description: "A community gathering.".to_string(),
            category: "community".to_string(),
            date: date.to_string(),
            time: "6:00 PM".to_string(),
            location: "Town Hall".to_string(),
            contact_info: String::new(),
            max_capacity: 0,
            tags: Vec::new(),
        }
    }

    async fn seed_event(store: &MemoryStore, owner: &User) -> EventView {
        create_event(store, fields("Potluck Dinner", "2026-05-01"), &owner.id)
            .await
            .unwrap()
    }

    // ========================================================================
    // Creation
    // ========================================================================

    #[tokio::test]
    async fn created_event_has_no_rsvp_or_favorite_for_its_owner() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let view = seed_event(&store, &alice).await;
        assert_eq!(view.user_rsvp, "");
        assert!(!view.is_favorited);
        assert_eq!(view.attendees_going, 0);
        assert_eq!(view.attendees_interested, 0);
        assert_eq!(view.organizer, "alice");
        assert_eq!(view.organizer_id, alice.id);

        let listed = list_events(
            &store,
            &EventFilter::default(),
            &Viewer::Identified(alice.id.clone()),
        )
        .await
        .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user_rsvp, "");
        assert!(!listed[0].is_favorited);
    }

    #[tokio::test]
    async fn create_event_rejects_invalid_fields_before_any_store_write() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let err = create_event(&store, fields("ab", "2026-05-01"), &alice.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let listed = store.list_events(&EventFilter::default()).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn create_event_for_unknown_owner_fails() {
        let store = MemoryStore::new();
        let err = create_event(&store, fields("Potluck", "2026-05-01"), "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    // ========================================================================
    // RSVP protocol
    // ========================================================================

    #[tokio::test]
    async fn rsvp_going_on_fresh_event_counts_one() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let event = seed_event(&store, &alice).await;

        let response = set_rsvp(&store, &event.id, &alice.id, "going").await.unwrap();
        assert_eq!(response.rsvp_status, "going");

        let stored = store.find_event(&event.id).await.unwrap().unwrap();
        assert_eq!(stored.attendees_going, 1);
        assert_eq!(stored.attendees_interested, 0);

        let view = stored.to_view(&Viewer::Identified(alice.id.clone()));
        assert_eq!(view.user_rsvp, "going");
    }

    #[tokio::test]
    async fn clearing_rsvp_returns_counts_to_zero() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let event = seed_event(&store, &alice).await;

        set_rsvp(&store, &event.id, &alice.id, "going").await.unwrap();
        let response = set_rsvp(&store, &event.id, &alice.id, "").await.unwrap();
        assert_eq!(response.rsvp_status, "");

        let stored = store.find_event(&event.id).await.unwrap().unwrap();
        assert_eq!(stored.attendees_going, 0);
        assert_eq!(stored.attendees_interested, 0);
        assert!(stored.rsvps.is_empty());

        let view = stored.to_view(&Viewer::Identified(alice.id.clone()));
        assert_eq!(view.user_rsvp, "");
    }

    #[tokio::test]
    async fn not_going_is_equivalent_to_clearing() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let event = seed_event(&store, &alice).await;

        set_rsvp(&store, &event.id, &alice.id, "interested").await.unwrap();
        let response = set_rsvp(&store, &event.id, &alice.id, "not_going").await.unwrap();
        assert_eq!(response.rsvp_status, "not_going");

        let stored = store.find_event(&event.id).await.unwrap().unwrap();
        assert!(stored.rsvps.is_empty());
        assert_eq!(stored.attendees_interested, 0);
    }

    #[tokio::test]
    async fn switching_status_moves_the_count() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let event = seed_event(&store, &alice).await;

        set_rsvp(&store, &event.id, &alice.id, "going").await.unwrap();
        set_rsvp(&store, &event.id, &alice.id, "interested").await.unwrap();

        let stored = store.find_event(&event.id).await.unwrap().unwrap();
        assert_eq!(stored.attendees_going, 0);
        assert_eq!(stored.attendees_interested, 1);
        assert_eq!(stored.rsvps.len(), 1);
    }

    #[tokio::test]
    async fn counters_always_match_the_rsvps_array() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        let carol = seed_user(&store, "carol").await;
        let event = seed_event(&store, &alice).await;

        set_rsvp(&store, &event.id, &alice.id, "going").await.unwrap();
        set_rsvp(&store, &event.id, &bob.id, "going").await.unwrap();
        set_rsvp(&store, &event.id, &carol.id, "interested").await.unwrap();
        set_rsvp(&store, &event.id, &bob.id, "").await.unwrap();

        let stored = store.find_event(&event.id).await.unwrap().unwrap();
        assert_eq!(
            (stored.attendees_going, stored.attendees_interested),
            stored.count_rsvps()
        );
        assert_eq!(stored.attendees_going, 1);
        assert_eq!(stored.attendees_interested, 1);
    }

    #[tokio::test]
    async fn invalid_rsvp_status_is_rejected_before_any_mutation() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let event = seed_event(&store, &alice).await;
        set_rsvp(&store, &event.id, &alice.id, "going").await.unwrap();

        let err = set_rsvp(&store, &event.id, &alice.id, "maybe").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let stored = store.find_event(&event.id).await.unwrap().unwrap();
        assert_eq!(stored.attendees_going, 1);
        assert_eq!(stored.rsvps.len(), 1);
    }

    #[tokio::test]
    async fn rsvp_on_missing_event_is_not_found() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let err = set_rsvp(&store, "missing", &alice.id, "going").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    // ========================================================================
    // Favorites
    // ========================================================================

    #[tokio::test]
    async fn favoriting_twice_is_idempotent() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let event = seed_event(&store, &alice).await;

        set_favorite(&store, &event.id, &alice.id, true).await.unwrap();
        set_favorite(&store, &event.id, &alice.id, true).await.unwrap();

        let stored = store.find_event(&event.id).await.unwrap().unwrap();
        assert_eq!(stored.favorites, vec![alice.id.clone()]);

        set_favorite(&store, &event.id, &alice.id, false).await.unwrap();
        set_favorite(&store, &event.id, &alice.id, false).await.unwrap();
        let stored = store.find_event(&event.id).await.unwrap().unwrap();
        assert!(stored.favorites.is_empty());
    }

    #[tokio::test]
    async fn each_user_sees_only_their_own_favorite() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        let event = seed_event(&store, &alice).await;

        set_favorite(&store, &event.id, &alice.id, true).await.unwrap();
        set_favorite(&store, &event.id, &bob.id, true).await.unwrap();

        for user in [&alice, &bob] {
            let listed = list_events(
                &store,
                &EventFilter::default(),
                &Viewer::Identified(user.id.clone()),
            )
            .await
            .unwrap();
            assert!(listed[0].is_favorited);
        }

        let anonymous = list_events(&store, &EventFilter::default(), &Viewer::Anonymous)
            .await
            .unwrap();
        assert!(!anonymous[0].is_favorited);

        // The payload carries only the derived flag; the identities of other
        // favoriting users are not observable from any view.
        let json = serde_json::to_value(&anonymous[0]).unwrap();
        assert!(!json.as_object().unwrap().contains_key("favorites"));
    }

    #[tokio::test]
    async fn favorite_on_missing_event_is_not_found() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let err = set_favorite(&store, "missing", &alice.id, true).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    // ========================================================================
    // Ownership
    // ========================================================================

    #[tokio::test]
    async fn non_owner_cannot_update_regardless_of_field_validity() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        let event = seed_event(&store, &alice).await;

        let err = update_event(
            &store,
            &event.id,
            fields("Hijacked Title", "2026-05-02"),
            &bob.id,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let stored = store.find_event(&event.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Potluck Dinner");
    }

    #[tokio::test]
    async fn non_owner_cannot_delete() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        let event = seed_event(&store, &alice).await;

        let err = delete_event(&store, &event.id, &bob.id).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert!(store.find_event(&event.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn owner_update_replaces_fields_but_not_embedded_state() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        let event = seed_event(&store, &alice).await;
        set_rsvp(&store, &event.id, &bob.id, "going").await.unwrap();

        update_event(
            &store,
            &event.id,
            fields("Potluck Dinner (rescheduled)", "2026-06-01"),
            &alice.id,
        )
        .await
        .unwrap();

        let stored = store.find_event(&event.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Potluck Dinner (rescheduled)");
        assert_eq!(stored.date, "2026-06-01");
        assert_eq!(stored.attendees_going, 1);
        assert_eq!(stored.rsvps.len(), 1);
        assert_eq!(stored.organizer_id, alice.id);
        assert_eq!(stored.created_at, event.created_at);
        assert!(stored.updated_at > stored.created_at);
    }

    #[tokio::test]
    async fn owner_delete_removes_event_and_embedded_state() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        let event = seed_event(&store, &alice).await;
        set_rsvp(&store, &event.id, &bob.id, "going").await.unwrap();
        set_favorite(&store, &event.id, &bob.id, true).await.unwrap();

        delete_event(&store, &event.id, &alice.id).await.unwrap();
        assert!(store.find_event(&event.id).await.unwrap().is_none());

        let err = get_event(&store, &event.id, &Viewer::Anonymous).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_event_is_not_found_before_ownership_is_considered() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let err = update_event(&store, "missing", fields("Title", "2026-05-01"), &alice.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = delete_event(&store, "missing", &alice.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    // ========================================================================
    // Listing and search
    // ========================================================================

    #[tokio::test]
    async fn listing_filters_by_category_and_search_together() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let mut bake_sale = fields("Bake Sale Fundraiser", "2026-05-03");
        bake_sale.category = "fundraiser".to_string();
        create_event(&store, bake_sale, &alice.id).await.unwrap();

        let mut car_wash = fields("Car Wash Fundraiser", "2026-05-01");
        car_wash.category = "fundraiser".to_string();
        create_event(&store, car_wash, &alice.id).await.unwrap();

        create_event(&store, fields("Bake-Off Contest", "2026-05-02"), &alice.id)
            .await
            .unwrap();

        let filter = EventFilter {
            category: Some("fundraiser".to_string()),
            search: Some("bake".to_string()),
        };
        let listed = list_events(&store, &filter, &Viewer::Anonymous).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Bake Sale Fundraiser");
    }

    #[tokio::test]
    async fn listing_orders_by_date_ascending() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        create_event(&store, fields("June Picnic", "2026-06-15"), &alice.id)
            .await
            .unwrap();
        create_event(&store, fields("April Cleanup", "2026-04-10"), &alice.id)
            .await
            .unwrap();
        create_event(&store, fields("May Concert", "2026-05-20"), &alice.id)
            .await
            .unwrap();

        let listed = list_events(&store, &EventFilter::default(), &Viewer::Anonymous)
            .await
            .unwrap();
        let titles: Vec<&str> = listed.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["April Cleanup", "May Concert", "June Picnic"]);
    }

    #[tokio::test]
    async fn search_matches_description_case_insensitively() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;

        let mut with_description = fields("Saturday Morning", "2026-05-02");
        with_description.description = "Bring your best CHILI recipe.".to_string();
        create_event(&store, with_description, &alice.id).await.unwrap();
        create_event(&store, fields("Book Swap", "2026-05-03"), &alice.id)
            .await
            .unwrap();

        let filter = EventFilter {
            category: None,
            search: Some("chili".to_string()),
        };
        let listed = list_events(&store, &filter, &Viewer::Anonymous).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Saturday Morning");
    }
}
