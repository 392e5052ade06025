//! Configuration types for slide conversion.
//!
//! All conversion behaviour is controlled through [`SlidesConfig`], built
//! via its [`SlidesConfigBuilder`]. Paths, URL prefixes, image parameters and
//! both concurrency ceilings live in one struct so a single value can be
//! shared by every document task and every page task of a run.
//!
//! # Design choice: builder over constructor
//! Callers (the CLI, tests, a build script) usually care about two or three
//! knobs. The builder lets them set only those and rely on the documented
//! defaults, which match the layout a static site expects:
//!
//! ```text
//! public/pdfs/*.pdf            (input, served as /pdfs/…)
//! public/images/slides/{id}/   (output images, served as /images/slides/…)
//! src/data/slides.json         (manifest consumed by the site templates)
//! ```

use crate::error::SlidesError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::{Path, PathBuf};

/// Configuration for a conversion run.
///
/// Built via [`SlidesConfig::builder()`] or using [`SlidesConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2slides::SlidesConfig;
///
/// let config = SlidesConfig::builder()
///     .pdf_dir("decks")
///     .dpi(150)
///     .page_concurrency(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Clone)]
pub struct SlidesConfig {
    /// Directory scanned for `*.pdf` files. Default: `public/pdfs`.
    pub pdf_dir: PathBuf,

    /// Root of the per-document image directories. Default: `public/images/slides`.
    pub image_dir: PathBuf,

    /// Directory the manifest is written to. Default: `src/data`.
    pub data_dir: PathBuf,

    /// Manifest file name inside `data_dir`. Default: `slides.json`.
    pub manifest_file: String,

    /// Public URL prefix under which `image_dir` is served. Default: `/images/slides`.
    pub image_url_prefix: String,

    /// Public URL prefix under which `pdf_dir` is served. Default: `/pdfs`.
    pub document_url_prefix: String,

    /// Rasterisation resolution passed to the external rasteriser. Range: 72–600. Default: 200.
    ///
    /// 200 DPI keeps slide text crisp on high-density screens; the full page
    /// JPEG is what the site shows in its slide viewer.
    pub dpi: u32,

    /// JPEG quality for full pages and thumbnails. Range: 1–100. Default: 90.
    pub jpeg_quality: u8,

    /// Thumbnail box width in pixels. Default: 300.
    pub thumbnail_width: u32,

    /// Thumbnail box height in pixels. Default: 200.
    pub thumbnail_height: u32,

    /// Pages post-processed at once within one document. Default: 8.
    pub page_concurrency: usize,

    /// Documents converted at once. Default: available parallelism − 1 (at least 1).
    ///
    /// Each document task runs an external rasteriser and then up to
    /// `page_concurrency` image jobs, so the effective ceiling on codec work
    /// is the product of the two.
    pub document_concurrency: usize,

    /// Rasteriser executable. Default: `pdftoppm` (poppler-utils).
    pub rasterizer_program: String,

    /// Upper bound on a single rasteriser invocation, in seconds. Default: 300.
    ///
    /// A wedged rasteriser would otherwise stall its document task, and with
    /// it the whole run, forever.
    pub rasterize_timeout_secs: u64,

    /// RSS feed settings. `None` (default) skips feed generation.
    pub feed: Option<FeedConfig>,

    /// Optional per-document progress hooks.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SlidesConfig {
    fn default() -> Self {
        Self {
            pdf_dir: PathBuf::from("public/pdfs"),
            image_dir: PathBuf::from("public/images/slides"),
            data_dir: PathBuf::from("src/data"),
            manifest_file: "slides.json".to_string(),
            image_url_prefix: "/images/slides".to_string(),
            document_url_prefix: "/pdfs".to_string(),
            dpi: 200,
            jpeg_quality: 90,
            thumbnail_width: 300,
            thumbnail_height: 200,
            page_concurrency: 8,
            document_concurrency: default_document_concurrency(),
            rasterizer_program: "pdftoppm".to_string(),
            rasterize_timeout_secs: 300,
            feed: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SlidesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlidesConfig")
            .field("pdf_dir", &self.pdf_dir)
            .field("image_dir", &self.image_dir)
            .field("data_dir", &self.data_dir)
            .field("manifest_file", &self.manifest_file)
            .field("image_url_prefix", &self.image_url_prefix)
            .field("document_url_prefix", &self.document_url_prefix)
            .field("dpi", &self.dpi)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("thumbnail", &(self.thumbnail_width, self.thumbnail_height))
            .field("page_concurrency", &self.page_concurrency)
            .field("document_concurrency", &self.document_concurrency)
            .field("rasterizer_program", &self.rasterizer_program)
            .field("rasterize_timeout_secs", &self.rasterize_timeout_secs)
            .field("feed", &self.feed)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl SlidesConfig {
    /// Create a new builder for `SlidesConfig`.
    pub fn builder() -> SlidesConfigBuilder {
        SlidesConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full path of the manifest file.
    pub fn manifest_path(&self) -> PathBuf {
        self.data_dir.join(&self.manifest_file)
    }

    /// Image directory for one document identifier.
    pub fn slide_dir(&self, id: &str) -> PathBuf {
        self.image_dir.join(id)
    }

    /// Public URL of an image file belonging to `id`.
    pub fn image_url(&self, id: &str, file_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.image_url_prefix.trim_end_matches('/'),
            id,
            file_name
        )
    }

    /// Public URL of a source document.
    pub fn document_url(&self, pdf_path: &Path) -> String {
        let name = pdf_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}/{}", self.document_url_prefix.trim_end_matches('/'), name)
    }
}

/// Document-level ceiling derived from the host: one core is left for the
/// orchestrator and the rasteriser processes' own overhead.
pub fn default_document_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

/// Builder for [`SlidesConfig`].
#[derive(Debug)]
pub struct SlidesConfigBuilder {
    config: SlidesConfig,
}

impl SlidesConfigBuilder {
    pub fn pdf_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdf_dir = dir.into();
        self
    }

    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_dir = dir.into();
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn manifest_file(mut self, name: impl Into<String>) -> Self {
        self.config.manifest_file = name.into();
        self
    }

    pub fn image_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.image_url_prefix = prefix.into();
        self
    }

    pub fn document_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.document_url_prefix = prefix.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn thumbnail_size(mut self, width: u32, height: u32) -> Self {
        self.config.thumbnail_width = width;
        self.config.thumbnail_height = height;
        self
    }

    pub fn page_concurrency(mut self, n: usize) -> Self {
        self.config.page_concurrency = n.max(1);
        self
    }

    pub fn document_concurrency(mut self, n: usize) -> Self {
        self.config.document_concurrency = n.max(1);
        self
    }

    pub fn rasterizer_program(mut self, program: impl Into<String>) -> Self {
        self.config.rasterizer_program = program.into();
        self
    }

    pub fn rasterize_timeout_secs(mut self, secs: u64) -> Self {
        self.config.rasterize_timeout_secs = secs;
        self
    }

    pub fn feed(mut self, feed: FeedConfig) -> Self {
        self.config.feed = Some(feed);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SlidesConfig, SlidesError> {
        let c = &self.config;
        if c.thumbnail_width == 0 || c.thumbnail_height == 0 {
            return Err(SlidesError::InvalidConfig(format!(
                "Thumbnail size must be non-zero, got {}x{}",
                c.thumbnail_width, c.thumbnail_height
            )));
        }
        if c.manifest_file.trim().is_empty() {
            return Err(SlidesError::InvalidConfig(
                "Manifest file name must not be empty".into(),
            ));
        }
        if c.rasterizer_program.trim().is_empty() {
            return Err(SlidesError::InvalidConfig(
                "Rasteriser program must not be empty".into(),
            ));
        }
        if c.rasterize_timeout_secs == 0 {
            return Err(SlidesError::InvalidConfig(
                "Rasteriser timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(ref feed) = c.feed {
            if !(feed.base_url.starts_with("http://") || feed.base_url.starts_with("https://")) {
                return Err(SlidesError::InvalidConfig(format!(
                    "Feed base URL must be http(s), got '{}'",
                    feed.base_url
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Feed ─────────────────────────────────────────────────────────────────

/// Channel-level settings for the RSS feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Absolute site URL, e.g. `https://example.github.io/talks/`.
    pub base_url: String,
    /// `channel/title`.
    pub title: String,
    /// `channel/description`.
    pub description: String,
    /// `channel/language`. Default: `en`.
    pub language: String,
    /// Site path of a slide page; item links are `{base_url}/{slides_path}/{id}`.
    /// Default: `slides`.
    pub slides_path: String,
    /// Where the feed file is written. Default: `public/rss.xml`.
    pub output_path: PathBuf,
}

impl FeedConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            title: "Slides".to_string(),
            description: "Slide decks".to_string(),
            language: "en".to_string(),
            slides_path: "slides".to_string(),
            output_path: PathBuf::from("public/rss.xml"),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn slides_path(mut self, path: impl Into<String>) -> Self {
        self.slides_path = path.into();
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Join `base_url` with a site-relative path using exactly one slash.
    pub fn absolute_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Canonical link of a slide page.
    pub fn slide_url(&self, id: &str) -> String {
        self.absolute_url(&format!("{}/{}", self.slides_path.trim_matches('/'), id))
    }

    /// Public URL of the feed itself, used for the `atom:link rel="self"`.
    pub fn self_url(&self) -> String {
        let name = self
            .output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "rss.xml".to_string());
        self.absolute_url(&name)
    }
}
