//! On-the-fly image resizing for `/image?width=`.

use std::{io::Cursor, path::Path};

use image::{
    DynamicImage, GenericImageView, ImageFormat, codecs::jpeg::JpegEncoder,
    imageops::FilterType,
};
use tracing::debug;

use crate::error::{CatalogError, Result};

const JPEG_QUALITY: u8 = 85;

/// Largest width or height a resize request may name.
pub const MAX_DIMENSION: u32 = 8192;

/// Number of crop offsets sampled along the overflowing axis.
const CROP_CANDIDATES: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeRequest {
    pub width: u32,
    pub height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Resized {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl Resized {
    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Decode, resize and re-encode `path` on the blocking pool.
pub async fn resize_file(path: &Path, request: ResizeRequest) -> Result<Resized> {
    let bytes = tokio::fs::read(path).await?;
    let hint = ImageFormat::from_path(path).ok();
    tokio::task::spawn_blocking(move || resize_image(&bytes, hint, request))
        .await
        .map_err(|err| CatalogError::Internal(format!("resize task failed: {err}")))?
}

/// Resize encoded image `bytes`.
///
/// Without a height the image is scaled proportionally to `width`. With one,
/// the image is scaled to cover the target and cropped at the most detailed
/// window. Output never exceeds the source: larger targets are shrunk to fit
/// it with their aspect ratio kept. The source format is kept when it can be
/// encoded, otherwise PNG.
pub fn resize_image(
    bytes: &[u8],
    hint: Option<ImageFormat>,
    request: ResizeRequest,
) -> Result<Resized> {
    if request.width == 0 || request.height == Some(0) {
        return Err(CatalogError::InvalidRequest(
            "resize dimensions must be positive".into(),
        ));
    }
    if request.width > MAX_DIMENSION || request.height.unwrap_or(0) > MAX_DIMENSION {
        return Err(CatalogError::InvalidRequest(format!(
            "resize dimensions must be at most {MAX_DIMENSION}"
        )));
    }

    let format = match hint {
        Some(format) => format,
        None => image::guess_format(bytes)?,
    };
    let source = image::load_from_memory_with_format(bytes, format)?;
    let (src_w, src_h) = source.dimensions();

    let resized = match request.height {
        None => {
            let width = request.width.min(src_w);
            let height = scaled_height(src_w, src_h, width).min(src_h);
            source.resize_exact(width, height, FilterType::Lanczos3)
        }
        Some(height) => {
            let (width, height) = fit_within(request.width, height, src_w, src_h);
            cover_fit(&source, width, height)
        }
    };
    debug!(
        src_w,
        src_h,
        out_w = resized.width(),
        out_h = resized.height(),
        "image resized"
    );

    let format = if format.writing_enabled() {
        format
    } else {
        ImageFormat::Png
    };
    Ok(Resized {
        bytes: encode(&resized, format)?,
        format,
    })
}

fn scaled_height(src_w: u32, src_h: u32, width: u32) -> u32 {
    let height = u64::from(src_h) * u64::from(width) / u64::from(src_w.max(1));
    u32::try_from(height).unwrap_or(u32::MAX).max(1)
}

/// Shrink a `width`x`height` target, keeping its aspect ratio, until it fits
/// inside the source.
fn fit_within(width: u32, height: u32, src_w: u32, src_h: u32) -> (u32, u32) {
    if width <= src_w && height <= src_h {
        return (width, height);
    }
    let factor = f64::min(
        f64::from(src_w) / f64::from(width),
        f64::from(src_h) / f64::from(height),
    );
    let shrink = |side: u32, limit: u32| {
        ((f64::from(side) * factor).round() as u32).clamp(1, limit.max(1))
    };
    (shrink(width, src_w), shrink(height, src_h))
}

fn cover_fit(source: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (src_w, src_h) = source.dimensions();
    let scale = f64::max(
        f64::from(width) / f64::from(src_w.max(1)),
        f64::from(height) / f64::from(src_h.max(1)),
    );
    let scaled_w = ((f64::from(src_w) * scale).ceil() as u32).max(width);
    let scaled_h = ((f64::from(src_h) * scale).ceil() as u32).max(height);
    let scaled = source.resize_exact(scaled_w, scaled_h, FilterType::Lanczos3);

    let (x, y) = entropy_anchor(&scaled, width, height);
    scaled.crop_imm(x, y, width, height)
}

/// Top-left corner of the `width`x`height` window with the highest luma
/// entropy. Only the overflowing axis is searched.
fn entropy_anchor(image: &DynamicImage, width: u32, height: u32) -> (u32, u32) {
    let luma = image.to_luma8();
    let slack_x = luma.width().saturating_sub(width);
    let slack_y = luma.height().saturating_sub(height);
    if slack_x == 0 && slack_y == 0 {
        return (0, 0);
    }

    let steps = CROP_CANDIDATES - 1;
    let mut best = (slack_x / 2, slack_y / 2);
    let mut best_entropy = f64::MIN;
    for step in 0..=steps {
        let x = slack_x * step / steps;
        let y = slack_y * step / steps;

        let mut histogram = [0u64; 256];
        for row in y..y + height {
            for col in x..x + width {
                histogram[usize::from(luma.get_pixel(col, row).0[0])] += 1;
            }
        }
        let entropy = shannon_entropy(&histogram);
        if entropy > best_entropy {
            best_entropy = entropy;
            best = (x, y);
        }
    }
    best
}

fn shannon_entropy(histogram: &[u64; 256]) -> f64 {
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0.0;
    }
    histogram
        .iter()
        .filter(|count| **count > 0)
        .map(|count| {
            let p = *count as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    if format == ImageFormat::Jpeg {
        let rgb = image.to_rgb8();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
        encoder.encode_image(&rgb)?;
    } else {
        image.write_to(&mut Cursor::new(&mut out), format)?;
    }
    Ok(out)
}
