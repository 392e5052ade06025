//! Error types for the pdf2slides library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SlidesError`] — **Fatal to a document, and therefore to the run**: the
//!   PDF is missing or corrupt, the rasteriser exited non-zero, an image could
//!   not be re-encoded. A document task returns it through the bounded
//!   scheduler, which stops starting new work and hands it to the caller. No
//!   manifest is written for a run that produced one.
//!
//! * [`MetadataError`] — **Non-fatal**: a sidecar descriptor exists but could
//!   not be read or parsed. It is logged as a warning and the document falls
//!   back to its derived defaults.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2slides library.
#[derive(Debug, Error)]
pub enum SlidesError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref or page tree is corrupt.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The page tree is valid but contains no pages.
    #[error("PDF '{path}' has no pages")]
    EmptyDocument { path: PathBuf },

    /// The input directory could not be listed.
    #[error("Failed to read input directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Rasteriser errors ─────────────────────────────────────────────────
    /// The rasteriser executable could not be started at all.
    #[error("Failed to start rasteriser '{program}': {source}\nIs poppler-utils installed?")]
    RasterizerUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The rasteriser ran and exited unsuccessfully.
    #[error("Rasterisation of '{path}' failed ({status}): {stderr}")]
    RasterizeFailed {
        path: PathBuf,
        status: String,
        stderr: String,
    },

    /// The rasteriser did not finish within the configured timeout.
    #[error("Rasterisation of '{path}' timed out after {secs}s")]
    RasterizeTimeout { path: PathBuf, secs: u64 },

    /// The rasteriser produced a different number of bitmaps than the page
    /// tree declares.
    #[error("PDF '{path}' declares {expected} pages but {actual} bitmaps were produced")]
    PageCountMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    /// Per-page results did not cover exactly pages `1..=n` after sorting.
    #[error("Page results for '{id}' are out of sequence: expected page {expected}, got {actual}")]
    PageSequence {
        id: String,
        expected: usize,
        actual: usize,
    },

    // ── Image errors ──────────────────────────────────────────────────────
    /// Decoding, resizing, or encoding a page image failed.
    #[error("Image processing failed for '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create a working or output directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem failure on an intermediate or derived file.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the manifest or feed file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest serialisation failed.
    #[error("Failed to serialise manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SlidesError {
    /// Wrap an I/O error that happened on `path`.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SlidesError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A non-fatal problem with a sidecar descriptor.
///
/// Never propagated: the metadata merger logs it and continues with an empty
/// overlay.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The sidecar exists but could not be read.
    #[error("Failed to read metadata '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The sidecar is not a valid descriptor object.
    #[error("Failed to parse metadata '{path}': {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The `date` field is present but is not a recognisable timestamp.
    #[error("Unrecognised date '{value}' in '{path}'")]
    InvalidDate { path: PathBuf, value: String },

    /// The `location` field is present but is not a `{text, url}` object.
    #[error("Ignoring location in '{path}': {source}")]
    InvalidLocation {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
