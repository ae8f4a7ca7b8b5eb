use std::path::PathBuf;

use axum::{
    Json,
    extract::{Query, RawQuery, State},
    http::header,
    response::IntoResponse,
};
use gallerist_model::{CatalogFilter, FilterSet, SortMode};
use serde::Deserialize;
use tracing::debug;
use url::form_urlencoded;

use super::BLOB_CACHE_CONTROL;
use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

/// Decoded `/gallery` query string.
#[derive(Debug, Default, PartialEq)]
pub struct GalleryQuery {
    pub gallery_id: Option<PathBuf>,
    pub offset: i64,
    pub sort: SortMode,
    pub filters: FilterSet,
}

impl GalleryQuery {
    /// Parse a raw query string. `filters` may repeat and is also accepted as
    /// `filters[]`.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let mut query = GalleryQuery::default();
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "galleryId" if !value.is_empty() => {
                    query.gallery_id = Some(PathBuf::from(value.as_ref()));
                }
                "offset" if !value.is_empty() => {
                    query.offset = value.trim().parse().map_err(|_| {
                        AppError::bad_request(format!("invalid offset '{value}'"))
                    })?;
                }
                "sort" => query.sort = value.parse()?,
                "filters" | "filters[]" if !value.is_empty() => {
                    query.filters.insert(value.parse::<CatalogFilter>()?);
                }
                _ => {}
            }
        }
        Ok(query)
    }
}

pub async fn get_gallery(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> AppResult<impl IntoResponse> {
    let query = GalleryQuery::parse(raw.as_deref().unwrap_or_default())?;
    let root = query
        .gallery_id
        .or_else(|| state.config().media_root.clone())
        .ok_or_else(|| {
            AppError::bad_request("galleryId is required when no media root is configured")
        })?;
    debug!(root = %root.display(), offset = query.offset, sort = %query.sort, "gallery requested");

    let page = state
        .catalog()
        .fetch_items(&root, query.offset, query.sort, query.filters)
        .await?;

    Ok(([(header::CACHE_CONTROL, BLOB_CACHE_CONTROL)], Json(page)))
}

#[derive(Debug, Deserialize)]
pub struct FiltersQuery {
    pub filter: Option<String>,
}

pub async fn get_filters(
    State(state): State<AppState>,
    Query(params): Query<FiltersQuery>,
) -> impl IntoResponse {
    let filters = state
        .catalog()
        .fetch_filters(params.filter.as_deref().filter(|s| !s.is_empty()));
    ([(header::CACHE_CONTROL, BLOB_CACHE_CONTROL)], Json(filters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gallerist_model::{ContentKind, EntryKind};
    use std::path::Path;

    #[test]
    fn parses_full_query() {
        let query = GalleryQuery::parse(
            "galleryId=%2Fmedia%2Fphotos&offset=2&sort=size\
             &filters=contentType%7Cimage&filters%5B%5D=type%7Cdirectory",
        )
        .unwrap();
        assert_eq!(query.gallery_id.as_deref(), Some(Path::new("/media/photos")));
        assert_eq!(query.offset, 2);
        assert_eq!(query.sort, SortMode::Size);
        assert!(query.filters.accepts_content(ContentKind::Image));
        assert!(!query.filters.accepts_content(ContentKind::Video));
        assert!(!query.filters.accepts_entry(EntryKind::File));
    }

    #[test]
    fn empty_query_uses_defaults() {
        assert_eq!(GalleryQuery::parse("").unwrap(), GalleryQuery::default());
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(GalleryQuery::parse("sort=sideways").is_err());
        assert!(GalleryQuery::parse("filters=colour%7Cred").is_err());
        assert!(GalleryQuery::parse("offset=two").is_err());
    }
}
