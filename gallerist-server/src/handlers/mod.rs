//! HTTP request handlers organized by functionality

pub mod catalog;
pub mod media;
pub mod range;

use axum::Json;
use serde_json::{Value, json};

/// Media and catalog responses are keyed by their full query string, so
/// clients may cache them indefinitely.
pub const BLOB_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

pub use catalog::{get_filters, get_gallery};
pub use media::{get_image, get_video};

pub async fn ping_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
