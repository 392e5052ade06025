//! Pipeline stages for PDF-to-slides conversion.
//!
//! Each submodule implements one step of a document task. The orchestration
//! (ordering, concurrency, failure policy) lives in [`crate::convert`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ postprocess ──▶ metadata
//! (discover) (pdftoppm)  (JPEG+thumb)   (sidecar)
//! ```
//!
//! 1. [`input`]  — list `*.pdf` files in name order and check their header
//! 2. [`render`] — page count via `lopdf`, bitmaps via an external
//!    rasteriser behind the [`render::Rasterizer`] trait
//! 3. [`postprocess`] — re-encode each bitmap, build its thumbnail, delete
//!    the bitmap; codec work runs in `spawn_blocking`
//! 4. [`metadata`] — overlay the optional JSON sidecar on derived defaults

pub mod input;
pub mod metadata;
pub mod postprocess;
pub mod render;
