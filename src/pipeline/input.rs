//! Input discovery: find the PDFs to convert and sanity-check each one.
//!
//! ## Why sort the listing?
//!
//! `read_dir` order is whatever the filesystem returns. The manifest is
//! ordered by discovery, so sorting by file name is what makes two runs over
//! the same directory produce byte-identical manifests.
//!
//! ## Why check magic bytes?
//!
//! A stray `notes.pdf` that is really an HTML download would otherwise only
//! fail inside the rasteriser, with a less helpful message. Checking `%PDF`
//! up front turns it into [`SlidesError::NotAPdf`].

use crate::error::SlidesError;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::debug;

/// `true` for names ending in `.pdf`, in any letter case.
pub fn is_pdf_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// List the PDF files directly inside `dir`, sorted by file name.
///
/// Subdirectories are not descended into. A directory with no PDFs yields an
/// empty list, not an error.
pub async fn discover_documents(dir: &Path) -> Result<Vec<PathBuf>, SlidesError> {
    let unreadable = |source| SlidesError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let name = entry.file_name();
        if !is_pdf_name(&name.to_string_lossy()) {
            continue;
        }
        let file_type = entry.file_type().await.map_err(unreadable)?;
        if file_type.is_dir() {
            continue;
        }
        found.push(entry.path());
    }

    found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Discovered {} PDFs in {}", found.len(), dir.display());
    Ok(found)
}

/// Validate that `path` exists, is readable and starts with `%PDF`.
pub async fn validate_document(path: &Path) -> Result<(), SlidesError> {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(e) => return Err(access_error(path, e)),
    };

    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic).await {
        Ok(_) if &magic != b"%PDF" => Err(SlidesError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        }),
        Ok(_) => Ok(()),
        // Too short to hold a header; the page-tree parse reports it.
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(()),
        Err(e) => Err(access_error(path, e)),
    }
}

fn access_error(path: &Path, e: std::io::Error) -> SlidesError {
    match e.kind() {
        std::io::ErrorKind::NotFound => SlidesError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => SlidesError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => SlidesError::io(path, e),
    }
}
