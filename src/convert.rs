//! Conversion entry points: one document, a list of documents, a directory.
//!
//! ## Layering
//!
//! ```text
//! convert_directory   dirs → discover → convert_documents → manifest → feed
//!   convert_documents   run_bounded over documents (document_concurrency)
//!     convert_document    validate → rasterise → run_bounded over pages → merge
//! ```
//!
//! Every level returns its result instead of pushing into shared state; the
//! manifest only exists once every document task has produced its record.
//! A single failing document fails the whole run and nothing is written.

use crate::config::SlidesConfig;
use crate::error::SlidesError;
use crate::output::{DocumentInfo, Manifest, RunSummary, SlideRecord};
use crate::pipeline::postprocess::{self, ImageParams, PageOutput};
use crate::pipeline::render::{self, Pdftoppm, Rasterizer};
use crate::pipeline::{input, metadata};
use crate::schedule::run_bounded;
use crate::slug::slugify;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert one PDF into its image directory and return its record.
///
/// Writes `{n}.jpg`, `thumb-{n}.jpg` and `thumb.jpg` under
/// `config.slide_dir(id)`. Does not touch the manifest.
///
/// # Errors
/// Any input, rasteriser or image error. Sidecar problems are only logged.
pub async fn convert_document<R: Rasterizer>(
    pdf: &Path,
    config: &SlidesConfig,
    rasterizer: &R,
) -> Result<SlideRecord, SlidesError> {
    let start = Instant::now();

    // ── Step 1: Validate input ───────────────────────────────────────────
    input::validate_document(pdf).await?;
    let stem = file_stem(pdf);
    let id = slugify(&stem);
    debug_assert!(crate::slug::is_url_safe(&id));
    let slide_dir = config.slide_dir(&id);
    info!("Converting {} → {}", pdf.display(), id);

    tokio::fs::create_dir_all(&slide_dir)
        .await
        .map_err(|source| SlidesError::CreateDirFailed {
            path: slide_dir.clone(),
            source,
        })?;

    // ── Step 2: Count pages from the page tree ───────────────────────────
    let expected = render::page_count(pdf).await?;

    // ── Step 3: Rasterise ────────────────────────────────────────────────
    // Bitmaps left behind by an interrupted run would be counted as pages.
    for stale in render::order_bitmaps(&slide_dir, &id).await? {
        tokio::fs::remove_file(&stale)
            .await
            .map_err(|e| SlidesError::io(&stale, e))?;
    }
    rasterizer.rasterize(pdf, &slide_dir, &id).await?;

    let bitmaps = render::order_bitmaps(&slide_dir, &id).await?;
    if bitmaps.len() != expected {
        return Err(SlidesError::PageCountMismatch {
            path: pdf.to_path_buf(),
            expected,
            actual: bitmaps.len(),
        });
    }

    // ── Step 4: Post-process pages ───────────────────────────────────────
    let params = ImageParams::from_config(config);
    let dir = slide_dir.as_path();
    let mut tasks = Vec::with_capacity(bitmaps.len());
    for bitmap in bitmaps {
        let page_num = bitmap
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(render::page_number)
            .ok_or_else(|| {
                SlidesError::Internal(format!("Unnumbered bitmap {}", bitmap.display()))
            })?;
        tasks.push(move || postprocess::process_page(bitmap, page_num, dir, params));
    }
    let mut pages = run_bounded(tasks, config.page_concurrency).await?;

    pages.sort_by_key(|p| p.page_num);
    check_page_sequence(&id, &pages)?;

    // ── Step 5: Document thumbnail ───────────────────────────────────────
    postprocess::write_document_thumbnail(&slide_dir, params).await?;

    // ── Step 6: Merge metadata ───────────────────────────────────────────
    let defaults = metadata::defaults_for(pdf, &stem)
        .await
        .map_err(|e| SlidesError::io(pdf, e))?;
    let sidecar = metadata::load_sidecar_or_default(pdf).await;
    let merged = metadata::merge(sidecar, defaults, &metadata::sidecar_path(pdf));

    // ── Step 7: Assemble record ──────────────────────────────────────────
    let record = SlideRecord {
        thumbnail: config.image_url(&id, postprocess::DOCUMENT_THUMBNAIL),
        thumbnails: pages
            .iter()
            .map(|p| config.image_url(&id, &p.thumbnail_file))
            .collect(),
        page_count: pages.len(),
        pdf_path: config.document_url(pdf),
        title: merged.title,
        description: merged.description,
        date: merged.date,
        location: merged.location,
        original_id: stem,
        id,
    };

    info!(
        "Converted {} ({} pages) in {}ms",
        record.id,
        record.page_count,
        start.elapsed().as_millis()
    );
    Ok(record)
}

/// Convert `pdfs` with at most `config.document_concurrency` in flight.
///
/// The manifest follows the order of `pdfs`, whatever order the documents
/// finish in.
pub async fn convert_documents<R: Rasterizer>(
    pdfs: Vec<PathBuf>,
    config: &SlidesConfig,
    rasterizer: &R,
) -> Result<Manifest, SlidesError> {
    for id in duplicate_ids(&pdfs) {
        warn!(
            "Several PDFs map to the identifier '{}'; they will share one image directory",
            id
        );
    }

    debug!(
        "Converting {} documents, {} at a time",
        pdfs.len(),
        config.document_concurrency
    );
    let tasks: Vec<_> = pdfs
        .into_iter()
        .map(|pdf| move || convert_tracked(pdf, config, rasterizer))
        .collect();
    run_bounded(tasks, config.document_concurrency).await
}

/// [`convert_document`] wrapped in the progress callback events.
async fn convert_tracked<R: Rasterizer>(
    pdf: PathBuf,
    config: &SlidesConfig,
    rasterizer: &R,
) -> Result<SlideRecord, SlidesError> {
    let name = pdf
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cb = config.progress_callback.as_ref();

    if let Some(cb) = cb {
        cb.on_document_start(&name);
    }
    let result = convert_document(&pdf, config, rasterizer).await;
    if let Some(cb) = cb {
        match &result {
            Ok(record) => cb.on_document_complete(&name, &record.id, record.page_count),
            Err(e) => cb.on_document_error(&name, &e.to_string()),
        }
    }
    result
}

/// Convert every PDF in `config.pdf_dir` and write the manifest (and the feed,
/// if configured).
///
/// The input, image and data directories are created first. An input
/// directory without PDFs is a successful run that writes nothing.
pub async fn convert_directory<R: Rasterizer>(
    config: &SlidesConfig,
    rasterizer: &R,
) -> Result<RunSummary, SlidesError> {
    let start = Instant::now();

    for dir in [&config.pdf_dir, &config.image_dir, &config.data_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| SlidesError::CreateDirFailed {
                path: dir.clone(),
                source,
            })?;
    }

    let pdfs = input::discover_documents(&config.pdf_dir).await?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(pdfs.len());
    }

    if pdfs.is_empty() {
        info!("No PDFs found in {}", config.pdf_dir.display());
        if let Some(ref cb) = config.progress_callback {
            cb.on_run_complete(0, start.elapsed().as_secs_f64());
        }
        return Ok(RunSummary {
            converted: 0,
            elapsed_ms: start.elapsed().as_millis() as u64,
            manifest: Vec::new(),
        });
    }

    let manifest = convert_documents(pdfs, config, rasterizer).await?;
    write_manifest(&manifest, config).await?;
    if let Some(ref feed) = config.feed {
        crate::feed::write_feed(&manifest, feed).await?;
    }

    let elapsed = start.elapsed();
    info!(
        "Converted {} PDFs in {:.2} seconds",
        manifest.len(),
        elapsed.as_secs_f64()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(manifest.len(), elapsed.as_secs_f64());
    }

    Ok(RunSummary {
        converted: manifest.len(),
        elapsed_ms: elapsed.as_millis() as u64,
        manifest,
    })
}

/// [`convert_directory`] with the `pdftoppm` rasteriser described by `config`.
pub async fn convert_all(config: &SlidesConfig) -> Result<RunSummary, SlidesError> {
    convert_directory(config, &Pdftoppm::from_config(config)).await
}

/// Serialise the manifest as a pretty JSON array and write it atomically.
pub async fn write_manifest(manifest: &Manifest, config: &SlidesConfig) -> Result<PathBuf, SlidesError> {
    let path = config.manifest_path();
    let mut json = serde_json::to_vec_pretty(manifest)?;
    json.push(b'\n');
    write_atomic(&path, json).await?;
    info!("Wrote {} records to {}", manifest.len(), path.display());
    Ok(path)
}

/// Page count and merged metadata for one PDF, without rasterising it.
pub async fn inspect(pdf: impl AsRef<Path>) -> Result<DocumentInfo, SlidesError> {
    let pdf = pdf.as_ref();
    input::validate_document(pdf).await?;
    let page_count = render::page_count(pdf).await?;

    let stem = file_stem(pdf);
    let sidecar_path = metadata::sidecar_path(pdf);
    let defaults = metadata::defaults_for(pdf, &stem)
        .await
        .map_err(|e| SlidesError::io(pdf, e))?;
    let sidecar = metadata::load_sidecar_or_default(pdf).await;
    let merged = metadata::merge(sidecar, defaults, &sidecar_path);

    Ok(DocumentInfo {
        id: slugify(&stem),
        original_id: stem,
        title: merged.title,
        description: merged.description,
        date: merged.date,
        page_count,
        has_sidecar: tokio::fs::try_exists(&sidecar_path).await.unwrap_or(false),
    })
}

/// Write `bytes` to `path` via a sibling temp file and a rename, so readers
/// never see a half-written file.
pub(crate) async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<(), SlidesError> {
    let failed = |source| SlidesError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{name}.tmp"));

    tokio::fs::write(&tmp_path, &bytes).await.map_err(failed)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(failed(e));
    }
    Ok(())
}

fn file_stem(pdf: &Path) -> String {
    pdf.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Identifiers claimed by more than one of `pdfs`, in first-seen order.
fn duplicate_ids(pdfs: &[PathBuf]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut dups = Vec::new();
    for pdf in pdfs {
        let id = slugify(&file_stem(pdf));
        let count = seen.entry(id.clone()).or_insert(0);
        *count += 1;
        if *count == 2 {
            dups.push(id);
        }
    }
    dups
}

/// Sorted page outputs must be exactly pages `1..=n`.
fn check_page_sequence(id: &str, pages: &[PageOutput]) -> Result<(), SlidesError> {
    debug_assert!(pages.windows(2).all(|w| w[0].page_num < w[1].page_num));
    for (i, page) in pages.iter().enumerate() {
        if page.page_num != i + 1 {
            return Err(SlidesError::PageSequence {
                id: id.to_string(),
                expected: i + 1,
                actual: page.page_num,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object};

    fn write_pdf(path: &Path, pages: usize) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), 300.into(), 200.into()],
                })
                .into()
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    fn page(n: usize) -> PageOutput {
        PageOutput {
            page_num: n,
            thumbnail_file: postprocess::thumbnail_file_name(n),
        }
    }

    #[test]
    fn page_sequence_must_start_at_one_without_gaps() {
        assert!(check_page_sequence("d", &[page(1), page(2), page(3)]).is_ok());
        let err = check_page_sequence("d", &[page(1), page(3)]).unwrap_err();
        assert!(matches!(err, SlidesError::PageSequence { expected: 2, actual: 3, .. }));
        let err = check_page_sequence("d", &[page(2)]).unwrap_err();
        assert!(matches!(err, SlidesError::PageSequence { expected: 1, .. }));
    }

    #[test]
    fn duplicate_identifiers_are_reported_once() {
        let pdfs = vec![
            PathBuf::from("Intro Talk.pdf"),
            PathBuf::from("intro_talk.pdf"),
            PathBuf::from("intro-talk.PDF"),
            PathBuf::from("other.pdf"),
        ];
        assert_eq!(duplicate_ids(&pdfs), vec!["intro-talk".to_string()]);
    }

    #[tokio::test]
    async fn atomic_write_replaces_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("slides.json");

        write_atomic(&path, b"first".to_vec()).await.unwrap();
        write_atomic(&path, b"second".to_vec()).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let names: Vec<_> = std::fs::read_dir(dir.path().join("data"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["slides.json"]);
    }

    #[tokio::test]
    async fn manifest_is_pretty_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let config = SlidesConfig::builder().data_dir(dir.path()).build().unwrap();
        let path = write_manifest(&Vec::new(), &config).await.unwrap();
        assert_eq!(path, dir.path().join("slides.json"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "[]\n");
    }

    #[tokio::test]
    async fn inspect_reports_pages_and_sidecar_title() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("rust_meetup.pdf");
        write_pdf(&pdf, 3);

        let info = inspect(&pdf).await.unwrap();
        assert_eq!(info.page_count, 3);
        assert_eq!(info.id, "rust-meetup");
        assert_eq!(info.title, "Rust Meetup");
        assert!(!info.has_sidecar);

        std::fs::write(dir.path().join("rust_meetup.json"), r#"{"title":"Ownership"}"#).unwrap();
        let info = inspect(&pdf).await.unwrap();
        assert_eq!(info.title, "Ownership");
        assert!(info.has_sidecar);
    }

    #[tokio::test]
    async fn inspect_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("page.pdf");
        std::fs::write(&pdf, "<!doctype html>").unwrap();
        assert!(matches!(
            inspect(&pdf).await.unwrap_err(),
            SlidesError::NotAPdf { .. }
        ));
    }
}
