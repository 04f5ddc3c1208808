//! HTTP route handlers for the Townsquare server.
//!
//! This module provides the HTTP API endpoints:
//!
//! - `GET /api/health` - Health check endpoint
//! - `POST /api/auth/register` - Account registration
//! - `POST /api/auth/login` - Account login
//! - `GET /api/events` - List/search events (personalized when a token is present)
//! - `POST /api/events` - Create an event
//! - `GET /api/events/{id}` - Fetch a single event
//! - `PUT /api/events/{id}` - Update an event (owner only)
//! - `DELETE /api/events/{id}` - Delete an event (owner only)
//! - `POST /api/events/{id}/rsvp` - Set or clear the caller's RSVP
//! - `POST /api/events/{id}/favorite` - Set or clear the caller's favorite
//!
//! # Architecture
//!
//! All routes share application state through [`AppState`], which contains
//! the configuration and the document store. Handlers stay thin: they derive
//! the caller's identity from the `Authorization` header and delegate to the
//! `accounts` and `events` workflows.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use townsquare_server::config::Config;
//! use townsquare_server::routes::{create_router, AppState};
//! use townsquare_server::store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("failed to load config");
//!     let state = AppState::new(config, Arc::new(MemoryStore::new()));
//!     let app = create_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::accounts;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events;
use crate::store::{EventFilter, Store};
use crate::types::{
    AuthResponse, EventFields, EventView, FavoriteRequest, FavoriteResponse, LoginRequest,
    MessageResponse, RegisterRequest, RsvpRequest, RsvpResponse, Viewer,
};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<Config>,

    /// Document store backing the workflows.
    pub store: Arc<dyn Store>,

    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Creates a new application state over the given store.
    #[must_use]
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            start_time: Instant::now(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &"<Config>")
            .field("store", &"<Store>")
            .field("start_time", &self.start_time)
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the application router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/api/health", get(get_health))
        .route("/api/auth/register", post(post_register))
        .route("/api/auth/login", post(post_login))
        .route("/api/events", get(get_events).post(post_event))
        .route(
            "/api/events/{id}",
            get(get_event_by_id).put(put_event).delete(delete_event),
        )
        .route("/api/events/{id}/rsvp", post(post_rsvp))
        .route("/api/events/{id}/favorite", post(post_favorite))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Builds the CORS layer from the configured origin list.
fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_origin.trim() == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origin
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

// ============================================================================
// Identity extraction
// ============================================================================

/// The bearer token from the `Authorization` header, if any.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Requires a valid bearer token and yields the caller's user id.
fn require_identity(state: &AppState, headers: &HeaderMap) -> Result<String> {
    let token = bearer_token(headers).ok_or_else(|| Error::auth("missing bearer token"))?;
    accounts::authenticate(token, &state.config.jwt_secret)
}

/// Derives the viewer for optional-auth read endpoints.
fn viewer(state: &AppState, headers: &HeaderMap) -> Viewer {
    accounts::viewer_from_token(bearer_token(headers), &state.config.jwt_secret)
}

// ============================================================================
// Health
// ============================================================================

/// Response body for the health check endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Server status (always "ok" if responding).
    pub status: String,

    /// Current server time.
    pub timestamp: DateTime<Utc>,

    /// Server uptime in seconds.
    pub uptime_seconds: u64,
}

/// GET /api/health - liveness probe. No authentication required.
async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Auth routes
// ============================================================================

/// POST /api/auth/register
async fn post_register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    let response = accounts::register(state.store.as_ref(), &state.config.jwt_secret, &request)
        .await?;
    Ok(Json(response))
}

/// POST /api/auth/login
async fn post_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let response =
        accounts::login(state.store.as_ref(), &state.config.jwt_secret, &request).await?;
    Ok(Json(response))
}

// ============================================================================
// Event routes
// ============================================================================

/// Query parameters for event listing.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Exact category match.
    pub category: Option<String>,

    /// Case-insensitive substring match against title or description.
    pub search: Option<String>,
}

impl EventsQuery {
    fn into_filter(self) -> EventFilter {
        EventFilter {
            category: self.category,
            search: self.search,
        }
    }
}

/// GET /api/events - list events, personalized when a token is present.
async fn get_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<EventView>>> {
    let viewer = viewer(&state, &headers);
    let views = events::list_events(state.store.as_ref(), &query.into_filter(), &viewer).await?;
    Ok(Json(views))
}

/// GET /api/events/{id} - fetch a single event.
async fn get_event_by_id(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
) -> Result<Json<EventView>> {
    let viewer = viewer(&state, &headers);
    let view = events::get_event(state.store.as_ref(), &event_id, &viewer).await?;
    Ok(Json(view))
}

/// POST /api/events - create an event. Requires authentication.
async fn post_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(fields): Json<EventFields>,
) -> Result<(StatusCode, Json<EventView>)> {
    let caller_id = require_identity(&state, &headers)?;
    let view = events::create_event(state.store.as_ref(), fields, &caller_id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// PUT /api/events/{id} - update an event. Owner only.
async fn put_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    Json(fields): Json<EventFields>,
) -> Result<Json<MessageResponse>> {
    let caller_id = require_identity(&state, &headers)?;
    events::update_event(state.store.as_ref(), &event_id, fields, &caller_id).await?;
    Ok(Json(MessageResponse {
        message: "event updated".to_string(),
    }))
}

/// DELETE /api/events/{id} - delete an event. Owner only.
async fn delete_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
) -> Result<StatusCode> {
    let caller_id = require_identity(&state, &headers)?;
    events::delete_event(state.store.as_ref(), &event_id, &caller_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/events/{id}/rsvp - set or clear the caller's RSVP.
async fn post_rsvp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    Json(request): Json<RsvpRequest>,
) -> Result<Json<RsvpResponse>> {
    let caller_id = require_identity(&state, &headers)?;
    let response = events::set_rsvp(
        state.store.as_ref(),
        &event_id,
        &caller_id,
        &request.rsvp_status,
    )
    .await?;
    Ok(Json(response))
}

/// POST /api/events/{id}/favorite - set or clear the caller's favorite.
async fn post_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    Json(request): Json<FavoriteRequest>,
) -> Result<Json<FavoriteResponse>> {
    let caller_id = require_identity(&state, &headers)?;
    let response = events::set_favorite(
        state.store.as_ref(),
        &event_id,
        &caller_id,
        request.is_favorited,
    )
    .await?;
    Ok(Json(response))
}

// ============================================================================
// Tests
// ============================================================================
