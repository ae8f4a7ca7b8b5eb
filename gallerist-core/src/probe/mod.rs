//! Media classification and dimension probing.
//!
//! Classification is by extension only (MIME lookup); images are measured
//! from their header without a full decode, videos through `ffprobe`.

pub mod ffprobe;
pub mod representative;

use std::{
    fmt,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use gallerist_model::ContentKind;
use mime_guess::mime;

use crate::error::ProbeError;
pub use ffprobe::FfprobeConfig;
pub use representative::locate_representative;

/// Kind and pixel size of a probed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub kind: ContentKind,
    pub width: u32,
    pub height: u32,
}

/// Media family of `path` according to its extension, if it is media at all.
pub fn classify(path: &Path) -> Option<ContentKind> {
    let guessed = mime_guess::from_path(path).first()?;
    let top_level = guessed.type_();
    if top_level == mime::IMAGE {
        Some(ContentKind::Image)
    } else if top_level == mime::VIDEO {
        Some(ContentKind::Video)
    } else {
        None
    }
}

/// MIME type to serve `path` with.
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

#[async_trait]
pub trait DimensionProbe: Send + Sync + fmt::Debug {
    async fn probe(&self, path: &Path) -> Result<Dimensions, ProbeError>;
}

/// Production probe: header parsing for images, `ffprobe` for videos.
#[derive(Debug, Clone, Default)]
pub struct MediaProbe {
    ffprobe: FfprobeConfig,
}

impl MediaProbe {
    pub fn new(ffprobe: FfprobeConfig) -> Self {
        Self { ffprobe }
    }
}

#[async_trait]
impl DimensionProbe for MediaProbe {
    async fn probe(&self, path: &Path) -> Result<Dimensions, ProbeError> {
        match classify(path) {
            Some(ContentKind::Image) => read_image_dimensions(path).await,
            Some(ContentKind::Video) => {
                ffprobe::probe_video(&self.ffprobe, path).await
            }
            None => Err(ProbeError::Unsupported(path.to_path_buf())),
        }
    }
}

async fn read_image_dimensions(path: &Path) -> Result<Dimensions, ProbeError> {
    let owned: PathBuf = path.to_path_buf();
    let (width, height) = tokio::task::spawn_blocking(
        move || -> Result<(u32, u32), ProbeError> {
            let reader =
                image::ImageReader::open(&owned)?.with_guessed_format()?;
            Ok(reader.into_dimensions()?)
        },
    )
    .await
    .map_err(|err| {
        ProbeError::Undeterminable(format!("header task failed: {err}"))
    })??;

    if width == 0 || height == 0 {
        return Err(ProbeError::Undeterminable(format!(
            "{} reports empty dimensions {width}x{height}",
            path.display()
        )));
    }

    Ok(Dimensions {
        kind: ContentKind::Image,
        width,
        height,
    })
}
