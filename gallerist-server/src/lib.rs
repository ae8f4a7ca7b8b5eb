//! # Gallerist Server
//!
//! HTTP surface for the Gallerist media catalog:
//!
//! - `GET /gallery`: paged, sorted, filtered listing of a directory
//! - `GET /filters`: the selectable catalog filters
//! - `GET /image`: image bytes, optionally resized
//! - `GET /video`: byte-range video streaming
//! - `GET /ping`: liveness

pub mod handlers;
pub mod infra;
pub mod routes;
