//! # pdf2slides
//!
//! Turn a directory of PDF slide decks into what a static site needs to show
//! them: per-page JPEGs, padded thumbnails, a JSON manifest and an RSS feed.
//!
//! ## Pipeline Overview
//!
//! ```text
//! public/pdfs/*.pdf (+ optional {stem}.json sidecars)
//!  │
//!  ├─ 1. Input     discover PDFs (sorted), check the %PDF header
//!  ├─ 2. Slug      file stem → URL-safe identifier
//!  ├─ 3. Render    page count from the page tree, pdftoppm → PNG per page
//!  ├─ 4. Images    PNG → {n}.jpg + thumb-{n}.jpg (spawn_blocking), thumb.jpg
//!  ├─ 5. Metadata  sidecar overlay on derived defaults
//!  └─ 6. Output    slides.json manifest, optional rss.xml
//! ```
//!
//! Documents run concurrently (available parallelism − 1), and pages inside
//! each document run concurrently (8). Both levels go through
//! [`schedule::run_bounded`], which keeps results in input order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2slides::{convert_all, SlidesConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SlidesConfig::builder().pdf_dir("public/pdfs").build()?;
//!     let summary = convert_all(&config).await?;
//!     eprintln!("{} decks in {}ms", summary.converted, summary.elapsed_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2slides` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf2slides = { version = "0.1", default-features = false }
//! ```
//!
//! ## External tools
//!
//! Rasterisation shells out to `pdftoppm` from poppler-utils. Anything else
//! that writes `{prefix}-{page}.png` files can be plugged in through
//! [`Rasterizer`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod feed;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod schedule;
pub mod slug;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FeedConfig, SlidesConfig, SlidesConfigBuilder};
pub use convert::{
    convert_all, convert_directory, convert_document, convert_documents, inspect, write_manifest,
};
pub use error::{MetadataError, SlidesError};
pub use feed::{render_feed, write_feed};
pub use output::{DocumentInfo, Location, Manifest, RunSummary, SlideRecord};
pub use pipeline::render::{Pdftoppm, Rasterizer};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
