//! PDF rasterisation: one PNG per page via an external rasteriser, plus a
//! page count read from the PDF page tree.
//!
//! ## Why shell out?
//!
//! `pdftoppm` (poppler) renders slides faithfully, including fonts and
//! transparency groups that lighter renderers miss, and it is what a static
//! site CI image already carries. The process boundary is wrapped in
//! [`Rasterizer`] so that every outcome reaches the pipeline as a
//! `Result<_, SlidesError>` with the process's stderr attached, never as a
//! bare exit code.
//!
//! ## Why count pages separately?
//!
//! The page count comes from the document structure (`/Pages` tree via
//! `lopdf`), not from counting the PNGs that appear. Comparing the two catches
//! a rasteriser that silently skipped pages.
//!
//! ## Page order
//!
//! `pdftoppm` zero-pads page numbers only to the width of the last page, and
//! other rasterisers may not pad at all. [`order_bitmaps`] therefore sorts by
//! the numeric value of the trailing digits (`deck-2.png` before
//! `deck-10.png`), never lexicographically.

use crate::error::SlidesError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Turns one PDF into page bitmaps inside a working directory.
///
/// Implementations must write files named `{prefix}-{page}.png` (any zero
/// padding) into `out_dir` and return once all pages are on disk.
pub trait Rasterizer: Send + Sync {
    /// Rasterise every page of `pdf` into `out_dir`.
    fn rasterize(
        &self,
        pdf: &Path,
        out_dir: &Path,
        prefix: &str,
    ) -> impl Future<Output = Result<(), SlidesError>> + Send;
}

/// [`Rasterizer`] backed by poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    program: String,
    dpi: u32,
    timeout: Duration,
}

impl Pdftoppm {
    pub fn new(program: impl Into<String>, dpi: u32, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            dpi,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Build from the run configuration.
    pub fn from_config(config: &crate::config::SlidesConfig) -> Self {
        Self::new(
            config.rasterizer_program.clone(),
            config.dpi,
            config.rasterize_timeout_secs,
        )
    }

    fn command(&self, pdf: &Path, out_dir: &Path, prefix: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(pdf)
            .arg(out_dir.join(prefix))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            // A timed-out child is dropped with its future; make sure it dies too.
            .kill_on_drop(true);
        cmd
    }
}

impl Rasterizer for Pdftoppm {
    async fn rasterize(&self, pdf: &Path, out_dir: &Path, prefix: &str) -> Result<(), SlidesError> {
        debug!(
            "Running {} at {} DPI on {}",
            self.program,
            self.dpi,
            pdf.display()
        );

        let child = self
            .command(pdf, out_dir, prefix)
            .spawn()
            .map_err(|source| SlidesError::RasterizerUnavailable {
                program: self.program.clone(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| SlidesError::RasterizeTimeout {
                path: pdf.to_path_buf(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| SlidesError::io(pdf, e))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(SlidesError::RasterizeFailed {
                path: pdf.to_path_buf(),
                status: output.status.to_string(),
                stderr,
            });
        }
        // poppler can exit 0 after failing to render parts of a page.
        if has_error_lines(&stderr) {
            return Err(SlidesError::RasterizeFailed {
                path: pdf.to_path_buf(),
                status: output.status.to_string(),
                stderr,
            });
        }
        if !stderr.is_empty() {
            warn!("{} reported on {}: {}", self.program, pdf.display(), stderr);
        }
        Ok(())
    }
}

/// Whether rasteriser diagnostics contain an error line.
///
/// poppler tags each line with a category before the first `:` or `(`
/// (`Syntax Error (1234): ...`, `I/O Error: ...`, `Syntax Warning: ...`).
/// Any category ending in `Error` counts; warnings do not.
fn has_error_lines(stderr: &str) -> bool {
    stderr.lines().any(|line| {
        let category = line.split([':', '(']).next().unwrap_or_default().trim();
        category.ends_with("Error")
    })
}

/// Read the page count from the PDF page tree without rendering anything.
///
/// Parsing runs in `spawn_blocking`: `lopdf` loads the whole object table
/// synchronously, which for a 100 MB deck is long enough to stall the
/// runtime's worker thread.
pub async fn page_count(pdf: &Path) -> Result<usize, SlidesError> {
    let path = pdf.to_path_buf();
    tokio::task::spawn_blocking(move || page_count_blocking(&path))
        .await
        .map_err(|e| SlidesError::Internal(format!("Page-count task panicked: {}", e)))?
}

fn page_count_blocking(pdf: &Path) -> Result<usize, SlidesError> {
    let document = lopdf::Document::load(pdf).map_err(|e| SlidesError::CorruptPdf {
        path: pdf.to_path_buf(),
        detail: e.to_string(),
    })?;
    let pages = document.get_pages().len();
    if pages == 0 {
        return Err(SlidesError::EmptyDocument {
            path: pdf.to_path_buf(),
        });
    }
    info!("{}: {} pages", pdf.display(), pages);
    Ok(pages)
}

/// Page number encoded in a bitmap file name: the trailing run of digits of
/// the stem (`deck-007.png` → 7).
pub fn page_number(file_name: &str) -> Option<usize> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    let digits_start = stem
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    stem[digits_start..].parse().ok()
}

/// Collect the `{prefix}-N.png` bitmaps in `dir`, sorted by page number.
pub async fn order_bitmaps(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, SlidesError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| SlidesError::io(dir, e))?;

    let lead = format!("{prefix}-");
    let mut numbered = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SlidesError::io(dir, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_bitmap = name.starts_with(&lead)
            && Path::new(&name)
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("png"))
                .unwrap_or(false);
        if !is_bitmap {
            continue;
        }
        match page_number(&name[lead.len()..]) {
            Some(n) => numbered.push((n, entry.path())),
            None => warn!("Ignoring unnumbered bitmap {}", name),
        }
    }

    numbered.sort_by_key(|(n, _)| *n);
    Ok(numbered.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_number_uses_trailing_digits() {
        assert_eq!(page_number("deck-1.png"), Some(1));
        assert_eq!(page_number("deck-010.png"), Some(10));
        assert_eq!(page_number("2024-talk-3.png"), Some(3));
        assert_eq!(page_number("deck.png"), None);
    }

    #[tokio::test]
    async fn bitmaps_are_ordered_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["talk-10.png", "talk-2.png", "talk-1.png", "talk-9.png", "other-3.png", "talk-4.jpg"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let ordered = order_bitmaps(dir.path(), "talk").await.unwrap();
        let names: Vec<_> = ordered
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["talk-1.png", "talk-2.png", "talk-9.png", "talk-10.png"]);
    }

    #[tokio::test]
    async fn missing_program_is_reported_as_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let r = Pdftoppm::new("pdf2slides-no-such-rasterizer", 72, 5);
        let err = r
            .rasterize(Path::new("x.pdf"), dir.path(), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, SlidesError::RasterizerUnavailable { .. }), "got {err}");
    }

    #[tokio::test]
    async fn corrupt_pdf_page_count_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\nthis is not a pdf body").unwrap();
        let err = page_count(&path).await.unwrap_err();
        assert!(matches!(err, SlidesError::CorruptPdf { .. }), "got {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        // `cat` rejects the `-png` flag, exits non-zero and explains why on stderr.
        let dir = tempfile::tempdir().unwrap();
        let r = Pdftoppm::new("cat", 72, 5);
        let err = r
            .rasterize(Path::new("deck.pdf"), dir.path(), "deck")
            .await
            .unwrap_err();
        match err {
            SlidesError::RasterizeFailed { stderr, .. } => {
                assert!(stderr.contains("option"), "stderr: {stderr}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn error_lines_are_told_apart_from_warnings() {
        assert!(has_error_lines("Syntax Error: Invalid object stream"));
        assert!(has_error_lines("Syntax Warning: ignoring\nSyntax Error (1234): Bad xref"));
        assert!(has_error_lines("I/O Error: Couldn't open file"));
        assert!(has_error_lines("Internal Error: xref num 7 not found"));
        assert!(!has_error_lines("Syntax Warning: Invalid Font Weight"));
        assert!(!has_error_lines("Errors are fine in a message body: really"));
        assert!(!has_error_lines(""));
    }

    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn error_output_on_clean_exit_fails_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let script = script(
            dir.path(),
            "noisy.sh",
            "echo 'Syntax Error: Invalid object stream' >&2\nexit 0",
        );

        let r = Pdftoppm::new(script.to_string_lossy(), 72, 5);
        let err = r
            .rasterize(Path::new("deck.pdf"), dir.path(), "deck")
            .await
            .unwrap_err();
        match err {
            SlidesError::RasterizeFailed { stderr, .. } => {
                assert!(stderr.contains("Invalid object stream"), "stderr: {stderr}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn warning_output_on_clean_exit_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let script = script(
            dir.path(),
            "chatty.sh",
            "echo 'Syntax Warning: Invalid Font Weight' >&2\nexit 0",
        );

        let r = Pdftoppm::new(script.to_string_lossy(), 72, 5);
        r.rasterize(Path::new("deck.pdf"), dir.path(), "deck")
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_rasterizer_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let script = script(dir.path(), "hang.sh", "sleep 30");

        let r = Pdftoppm::new(script.to_string_lossy(), 72, 1);
        let err = r
            .rasterize(Path::new("deck.pdf"), dir.path(), "deck")
            .await
            .unwrap_err();
        assert!(matches!(err, SlidesError::RasterizeTimeout { secs: 1, .. }), "got {err}");
    }
}
