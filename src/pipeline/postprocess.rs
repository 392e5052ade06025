//! Page post-processing: PNG bitmap → full-size JPEG + padded thumbnail.
//!
//! For page `n` of a document the stage writes, next to the bitmap:
//!
//! ```text
//! {n}.jpg         full page, re-encoded at the configured JPEG quality
//! thumb-{n}.jpg   "contain" resize into the thumbnail box, gray padding
//! ```
//!
//! and then deletes the bitmap. Rasterised PNGs at 200 DPI are several MB
//! each; deleting them as soon as both outputs exist keeps a failed run from
//! leaving a directory full of them. The flip side is that a half-finished
//! document cannot be resumed page by page: re-run it from rasterisation.
//!
//! Decoding, resizing and encoding are CPU-bound and run in
//! `spawn_blocking`, like every other codec call in this crate.

use crate::error::SlidesError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Padding colour for the area of the thumbnail box the page does not cover.
pub const PAD_COLOR: Rgb<u8> = Rgb([240, 240, 240]);

/// File name of the document-level thumbnail.
pub const DOCUMENT_THUMBNAIL: &str = "thumb.jpg";

/// Encoding parameters shared by every page of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageParams {
    pub quality: u8,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

impl ImageParams {
    pub fn from_config(config: &crate::config::SlidesConfig) -> Self {
        Self {
            quality: config.jpeg_quality,
            thumbnail_width: config.thumbnail_width,
            thumbnail_height: config.thumbnail_height,
        }
    }
}

/// What one page task reports back to its document task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutput {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Thumbnail file name inside the document's image directory.
    pub thumbnail_file: String,
}

/// Full-page JPEG name for page `n`.
pub fn page_file_name(page_num: usize) -> String {
    format!("{page_num}.jpg")
}

/// Thumbnail JPEG name for page `n`.
pub fn thumbnail_file_name(page_num: usize) -> String {
    format!("thumb-{page_num}.jpg")
}

/// Post-process one rasterised page and delete its bitmap.
pub async fn process_page(
    bitmap: PathBuf,
    page_num: usize,
    slide_dir: &Path,
    params: ImageParams,
) -> Result<PageOutput, SlidesError> {
    let full_path = slide_dir.join(page_file_name(page_num));
    let thumb_path = slide_dir.join(thumbnail_file_name(page_num));

    let source = bitmap.clone();
    tokio::task::spawn_blocking(move || {
        let img = image::open(&source).map_err(|e| SlidesError::Image {
            path: source.clone(),
            source: e,
        })?;
        save_jpeg(&img.to_rgb8(), &full_path, params.quality)?;
        let thumb = make_thumbnail(&img, params.thumbnail_width, params.thumbnail_height);
        save_jpeg(&thumb, &thumb_path, params.quality)
    })
    .await
    .map_err(|e| SlidesError::Internal(format!("Page {page_num} task panicked: {e}")))??;

    tokio::fs::remove_file(&bitmap)
        .await
        .map_err(|e| SlidesError::io(&bitmap, e))?;
    debug!("Page {} → {}", page_num, slide_dir.display());

    Ok(PageOutput {
        page_num,
        thumbnail_file: thumbnail_file_name(page_num),
    })
}

/// Write `thumb.jpg` for a document from its page-1 JPEG.
pub async fn write_document_thumbnail(
    slide_dir: &Path,
    params: ImageParams,
) -> Result<PathBuf, SlidesError> {
    let first = slide_dir.join(page_file_name(1));
    let out = slide_dir.join(DOCUMENT_THUMBNAIL);
    let target = out.clone();

    tokio::task::spawn_blocking(move || {
        let img = image::open(&first).map_err(|e| SlidesError::Image {
            path: first.clone(),
            source: e,
        })?;
        let thumb = make_thumbnail(&img, params.thumbnail_width, params.thumbnail_height);
        save_jpeg(&thumb, &target, params.quality)
    })
    .await
    .map_err(|e| SlidesError::Internal(format!("Thumbnail task panicked: {e}")))??;

    Ok(out)
}

/// Fit `img` inside a `width`×`height` box without cropping, centre it, and
/// fill the rest with [`PAD_COLOR`].
pub fn make_thumbnail(img: &DynamicImage, width: u32, height: u32) -> RgbImage {
    let fitted = img.resize(width, height, FilterType::Lanczos3).to_rgb8();
    let mut canvas = RgbImage::from_pixel(width, height, PAD_COLOR);
    let x = (width.saturating_sub(fitted.width())) / 2;
    let y = (height.saturating_sub(fitted.height())) / 2;
    imageops::overlay(&mut canvas, &fitted, i64::from(x), i64::from(y));
    canvas
}

fn save_jpeg(img: &RgbImage, path: &Path, quality: u8) -> Result<(), SlidesError> {
    let file = std::fs::File::create(path).map_err(|e| SlidesError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode_image(img)
        .map_err(|e| SlidesError::Image {
            path: path.to_path_buf(),
            source: e,
        })?;
    writer.flush().map_err(|e| SlidesError::io(path, e))
}
