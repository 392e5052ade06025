//! CLI binary for pdf2slides.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SlidesConfig` and prints one line per document.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2slides::{
    convert_all, inspect, ConversionProgressCallback, FeedConfig, ProgressCallback, SlidesConfig,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback ────────────────────────────────────────────────────

/// Prints a line as each document finishes. Documents run concurrently, so
/// lines appear in completion order, numbered by completion.
struct CliProgressCallback {
    total: AtomicUsize,
    done: AtomicUsize,
    start_times: Mutex<HashMap<String, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            total: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, name: &str) -> f64 {
        self.start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_documents: usize) {
        self.total.store(total_documents, Ordering::SeqCst);
        if total_documents > 0 {
            eprintln!(
                "{} {}",
                cyan("◆"),
                bold(&format!("Converting {total_documents} PDFs…"))
            );
        }
    }

    fn on_document_start(&self, name: &str) {
        self.start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Instant::now());
    }

    fn on_document_complete(&self, name: &str, id: &str, page_count: usize) {
        let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        eprintln!(
            "  {} [{:>3}/{:<3}] {}  {}  {}",
            green("✓"),
            n,
            self.total.load(Ordering::SeqCst),
            name,
            dim(&format!("→ {id} ({page_count} pages)")),
            dim(&format!("{:.1}s", self.elapsed_secs(name))),
        );
    }

    fn on_document_error(&self, name: &str, error: &str) {
        let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        // Only the first line; the full chain is printed when the run fails.
        let first_line = error.lines().next().unwrap_or(error);
        eprintln!(
            "  {} [{:>3}/{:<3}] {}  {}  {}",
            red("✗"),
            n,
            self.total.load(Ordering::SeqCst),
            name,
            red(first_line),
            dim(&format!("{:.1}s", self.elapsed_secs(name))),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert public/pdfs/*.pdf with the default site layout
  pdf2slides

  # Custom directories, lower resolution
  pdf2slides --pdf-dir decks --image-dir site/img/slides --data-dir site/data --dpi 150

  # Also write public/rss.xml
  pdf2slides --feed-url https://example.github.io/talks --feed-title "My Talks"

  # Show what would be recorded for one deck, without rendering it
  pdf2slides --inspect public/pdfs/intro.pdf

OUTPUT LAYOUT:
  {image-dir}/{id}/{n}.jpg        full page, JPEG
  {image-dir}/{id}/thumb-{n}.jpg  page thumbnail, padded to the thumbnail box
  {image-dir}/{id}/thumb.jpg      document thumbnail (page 1)
  {data-dir}/slides.json          manifest, one record per PDF

SIDECAR METADATA:
  A {stem}.json next to a PDF may set any of:
    { "title": "...", "description": "...", "date": "2024-04-18T19:00:00+09:00",
      "location": { "text": "...", "url": "..." } }

REQUIREMENTS:
  pdftoppm (poppler-utils) on PATH, or --rasterizer /path/to/pdftoppm
"#;

/// Convert a directory of PDF slide decks into images, thumbnails and a manifest.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2slides",
    version,
    about = "Convert PDF slide decks into page images, thumbnails, a JSON manifest and an RSS feed",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory scanned for *.pdf files.
    #[arg(long, env = "PDF2SLIDES_PDF_DIR", default_value = "public/pdfs")]
    pdf_dir: PathBuf,

    /// Root directory for per-document image directories.
    #[arg(long, env = "PDF2SLIDES_IMAGE_DIR", default_value = "public/images/slides")]
    image_dir: PathBuf,

    /// Directory the manifest is written to.
    #[arg(long, env = "PDF2SLIDES_DATA_DIR", default_value = "src/data")]
    data_dir: PathBuf,

    /// Manifest file name inside --data-dir.
    #[arg(long, env = "PDF2SLIDES_MANIFEST", default_value = "slides.json")]
    manifest: String,

    /// Public URL prefix of --image-dir.
    #[arg(long, env = "PDF2SLIDES_IMAGE_URL_PREFIX", default_value = "/images/slides")]
    image_url_prefix: String,

    /// Public URL prefix of --pdf-dir.
    #[arg(long, env = "PDF2SLIDES_PDF_URL_PREFIX", default_value = "/pdfs")]
    pdf_url_prefix: String,

    /// Rasterisation DPI (72–600).
    #[arg(long, env = "PDF2SLIDES_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// JPEG quality (1–100).
    #[arg(long, env = "PDF2SLIDES_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Thumbnail box width in pixels.
    #[arg(long, env = "PDF2SLIDES_THUMB_WIDTH", default_value_t = 300)]
    thumb_width: u32,

    /// Thumbnail box height in pixels.
    #[arg(long, env = "PDF2SLIDES_THUMB_HEIGHT", default_value_t = 200)]
    thumb_height: u32,

    /// Pages post-processed at once per document.
    #[arg(long, env = "PDF2SLIDES_PAGE_CONCURRENCY", default_value_t = 8)]
    page_concurrency: usize,

    /// Documents converted at once. Default: available cores − 1.
    #[arg(short = 'j', long, env = "PDF2SLIDES_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Rasteriser executable.
    #[arg(long, env = "PDF2SLIDES_RASTERIZER", default_value = "pdftoppm")]
    rasterizer: String,

    /// Per-document rasteriser timeout in seconds.
    #[arg(long, env = "PDF2SLIDES_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Absolute site URL; enables RSS feed generation.
    #[arg(long, env = "PDF2SLIDES_FEED_URL")]
    feed_url: Option<String>,

    /// Feed channel title.
    #[arg(long, env = "PDF2SLIDES_FEED_TITLE", default_value = "Slides")]
    feed_title: String,

    /// Feed channel description.
    #[arg(long, env = "PDF2SLIDES_FEED_DESCRIPTION", default_value = "Slide decks")]
    feed_description: String,

    /// Feed channel language.
    #[arg(long, env = "PDF2SLIDES_FEED_LANGUAGE", default_value = "en")]
    feed_language: String,

    /// Site path of a slide page (item links are {feed-url}/{path}/{id}).
    #[arg(long, env = "PDF2SLIDES_FEED_SLIDES_PATH", default_value = "slides")]
    feed_slides_path: String,

    /// Where the feed is written.
    #[arg(long, env = "PDF2SLIDES_FEED_OUTPUT", default_value = "public/rss.xml")]
    feed_output: PathBuf,

    /// Print page count and metadata for one PDF, no conversion.
    #[arg(long, value_name = "PDF")]
    inspect: Option<PathBuf>,

    /// With --inspect: print JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Disable per-document progress lines.
    #[arg(long, env = "PDF2SLIDES_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2SLIDES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2SLIDES_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Progress lines already say what finished; keep library INFO logs for
    // --verbose or when progress is off.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if let Some(ref pdf) = cli.inspect {
        let info = inspect(pdf)
            .await
            .with_context(|| format!("Failed to inspect {}", pdf.display()))?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise metadata")?
            );
        } else {
            println!("File:         {}", pdf.display());
            println!("Id:           {}", info.id);
            println!("Title:        {}", info.title);
            if !info.description.is_empty() {
                println!("Description:  {}", info.description);
            }
            println!("Date:         {}", pdf2slides::output::format_instant(&info.date));
            println!("Pages:        {}", info.page_count);
            println!("Sidecar:      {}", if info.has_sidecar { "yes" } else { "no" });
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let summary = convert_all(&config).await.context("Conversion failed")?;

    if !cli.quiet {
        eprintln!(
            "{} Converted {} PDFs in {:.2} seconds",
            green("✔"),
            bold(&summary.converted.to_string()),
            summary.elapsed_ms as f64 / 1000.0,
        );
        if summary.converted > 0 {
            eprintln!(
                "   {}",
                dim(&format!("→ {}", config.manifest_path().display()))
            );
        }
    }

    Ok(())
}

/// Map CLI args to `SlidesConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SlidesConfig> {
    let mut builder = SlidesConfig::builder()
        .pdf_dir(&cli.pdf_dir)
        .image_dir(&cli.image_dir)
        .data_dir(&cli.data_dir)
        .manifest_file(&cli.manifest)
        .image_url_prefix(&cli.image_url_prefix)
        .document_url_prefix(&cli.pdf_url_prefix)
        .dpi(cli.dpi)
        .jpeg_quality(cli.quality)
        .thumbnail_size(cli.thumb_width, cli.thumb_height)
        .page_concurrency(cli.page_concurrency)
        .rasterizer_program(&cli.rasterizer)
        .rasterize_timeout_secs(cli.timeout);

    if let Some(n) = cli.concurrency {
        builder = builder.document_concurrency(n);
    }

    if let Some(ref url) = cli.feed_url {
        builder = builder.feed(
            FeedConfig::new(url)
                .title(&cli.feed_title)
                .description(&cli.feed_description)
                .language(&cli.feed_language)
                .slides_path(&cli.feed_slides_path)
                .output_path(&cli.feed_output),
        );
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
