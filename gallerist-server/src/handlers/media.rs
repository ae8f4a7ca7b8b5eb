use std::{
    io::SeekFrom,
    path::{Path, PathBuf},
};

use axum::{
    body::Body,
    extract::Query,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use gallerist_core::{probe::content_type_for, thumbnail};
use serde::Deserialize;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt},
};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use super::{
    BLOB_CACHE_CONTROL,
    range::{parse_range_header, unsatisfied_range},
};
use crate::infra::errors::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub uri: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VideoQuery {
    pub uri: Option<String>,
}

fn required_uri(uri: Option<String>) -> AppResult<PathBuf> {
    match uri {
        Some(uri) if !uri.is_empty() => Ok(PathBuf::from(uri)),
        _ => Err(AppError::bad_request("missing uri parameter")),
    }
}

fn positive_dimension(name: &str, raw: Option<&str>) -> AppResult<Option<u32>> {
    let Some(raw) = raw.filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if value > i64::from(thumbnail::MAX_DIMENSION) => Err(AppError::bad_request(
            format!("{name} must be at most {}", thumbnail::MAX_DIMENSION),
        )),
        Ok(value) if value > 0 => Ok(u32::try_from(value).ok()),
        _ => Err(AppError::bad_request(format!(
            "{name} must be a positive integer, got '{raw}'"
        ))),
    }
}

/// Open a client-named regular file and return it with its size.
async fn open_media(path: &Path) -> AppResult<(File, u64)> {
    let what = path.display();
    let file = File::open(path)
        .await
        .map_err(|err| AppError::file_access(&err, &what))?;
    let meta = file
        .metadata()
        .await
        .map_err(|err| AppError::file_access(&err, &what))?;
    if !meta.is_file() {
        return Err(AppError::not_found(format!("{what} is not a file")));
    }
    Ok((file, meta.len()))
}

/// `GET /image`: raw bytes, or a resized copy when `width` is given.
pub async fn get_image(
    Query(params): Query<ImageQuery>,
) -> AppResult<Response> {
    let path = required_uri(params.uri)?;
    let width = positive_dimension("width", params.width.as_deref())?;
    let height = positive_dimension("height", params.height.as_deref())?;

    let (file, size) = open_media(&path).await?;

    let Some(width) = width else {
        let stream = ReaderStream::new(file);
        return Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type_for(&path))
            .header(header::CONTENT_LENGTH, size)
            .header(header::CACHE_CONTROL, BLOB_CACHE_CONTROL)
            .body(Body::from_stream(stream))
            .map_err(|err| AppError::internal(format!("failed to build response: {err}")));
    };
    drop(file);

    let resized = thumbnail::resize_file(
        &path,
        thumbnail::ResizeRequest { width, height },
    )
    .await?;
    debug!(path = %path.display(), width, ?height, bytes = resized.bytes.len(), "served resized image");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, resized.content_type())
        .header(header::CONTENT_LENGTH, resized.bytes.len())
        .header(header::CACHE_CONTROL, BLOB_CACHE_CONTROL)
        .body(Body::from(resized.bytes))
        .map_err(|err| AppError::internal(format!("failed to build response: {err}")))
}

/// `GET /video`: one capped byte range per request.
pub async fn get_video(
    Query(params): Query<VideoQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let path = required_uri(params.uri)?;
    let (mut file, size) = open_media(&path).await?;

    let Some(raw_range) = headers.get(header::RANGE) else {
        return Ok(unsatisfiable(size, "video requests require a Range header"));
    };
    let range = raw_range
        .to_str()
        .ok()
        .and_then(|raw| parse_range_header(raw, size))
        .map(|range| range.capped());
    let Some(range) = range else {
        return Ok(unsatisfiable(size, "requested range is not satisfiable"));
    };

    file.seek(SeekFrom::Start(range.start))
        .await
        .map_err(|err| AppError::internal(format!("seek failed: {err}")))?;
    let stream = ReaderStream::new(file.take(range.length()));
    info!(path = %path.display(), start = range.start, end = range.end, size, "streaming video range");

    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, content_type_for(&path))
        .header(header::CONTENT_LENGTH, range.length())
        .header(header::CONTENT_RANGE, range.content_range(size))
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, BLOB_CACHE_CONTROL)
        .body(Body::from_stream(stream))
        .map_err(|err| AppError::internal(format!("failed to build response: {err}")))
}

fn unsatisfiable(size: u64, message: &str) -> Response {
    let mut response = AppError::range_not_satisfiable(message).into_response();
    if let Ok(value) = unsatisfied_range(size).parse() {
        response.headers_mut().insert(header::CONTENT_RANGE, value);
    }
    response
        .headers_mut()
        .insert(header::ACCEPT_RANGES, header::HeaderValue::from_static("bytes"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_must_be_positive_and_bounded() {
        assert_eq!(positive_dimension("width", None).unwrap(), None);
        assert_eq!(positive_dimension("width", Some("")).unwrap(), None);
        assert_eq!(positive_dimension("width", Some("120")).unwrap(), Some(120));
        assert!(positive_dimension("width", Some("0")).is_err());
        assert!(positive_dimension("width", Some("-4")).is_err());
        assert!(positive_dimension("width", Some("wide")).is_err());
        assert_eq!(positive_dimension("width", Some("8192")).unwrap(), Some(8192));
        assert!(positive_dimension("width", Some("8193")).is_err());
        assert!(positive_dimension("height", Some("4294967295")).is_err());
    }

    #[test]
    fn uri_is_required() {
        assert!(required_uri(None).is_err());
        assert!(required_uri(Some(String::new())).is_err());
        assert_eq!(required_uri(Some("/a.png".into())).unwrap(), PathBuf::from("/a.png"));
    }
}
