//! Townsquare Server - community event board API.
//!
//! This crate provides the backend service for Townsquare, responsible for:
//! - Account registration and login with signed identity tokens
//! - Community event management: create, list/search, update, delete
//! - Per-user RSVP and favorite state with derived attendance counters
//!
//! # Architecture
//!
//! Requests flow from the axum router (`routes`) into the `accounts` and
//! `events` workflows, which compose the credential/token primitives (`auth`)
//! with the document repository (`store`). The store is a trait seam with a
//! MongoDB implementation for production and an in-memory one for tests.

pub mod accounts;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod routes;
pub mod store;
pub mod types;
