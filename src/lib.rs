//! Property Feed Library
//!
//! Fetches XML property feeds, normalizes town names, tags listings
//! (key-ready, pool, beach and golf proximity, region) and serves the
//! result as a read-only JSON API.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External feed access.
//! - `catalog`: Queries over tagged listings.
//! - `classifier`: Listing tags from free text.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `feed_client`: HTTP client for one feed.
//! - `feed_parser`: XML feed parsing.
//! - `feed_service`: Cached, merged feed snapshots.
//! - `handlers`: HTTP request handlers.
//! - `matcher`: Fuzzy town/area matching.
//! - `models`: Core data models.
//! - `normalizer`: Town-name normalization.
//! - `taxonomy`: Keyword and lookup tables.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod errors;
pub mod feed_client;
pub mod feed_parser;
pub mod feed_service;
pub mod handlers;
pub mod matcher;
pub mod models;
pub mod normalizer;
pub mod taxonomy;
