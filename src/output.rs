//! Output types: one [`SlideRecord`] per converted document, plus the
//! run-level [`RunSummary`].
//!
//! The manifest is a plain `Vec<SlideRecord>` serialised as a pretty JSON
//! array with camelCase keys, which is what the site templates read.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered list of records, in document discovery order.
pub type Manifest = Vec<SlideRecord>;

/// Everything the site needs to render one slide deck.
///
/// A record only exists once every page of its document has been
/// post-processed; there is no partially filled state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideRecord {
    /// URL-safe identifier, also the image directory name.
    pub id: String,
    /// Source file stem, before slugification.
    pub original_id: String,
    pub title: String,
    pub description: String,
    /// Sidecar date when present and parseable, else the PDF's mtime.
    #[serde(with = "instant")]
    pub date: DateTime<Utc>,
    pub location: Option<Location>,
    /// Document-level thumbnail URL (`…/{id}/thumb.jpg`).
    pub thumbnail: String,
    pub page_count: usize,
    /// Public URL of the source PDF.
    pub pdf_path: String,
    /// Per-page thumbnail URLs; `thumbnails[0]` is page 1.
    pub thumbnails: Vec<String>,
}

/// Where a deck was presented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub text: String,
    pub url: String,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Number of documents converted (equals `manifest.len()`).
    pub converted: usize,
    /// Wall-clock time of the whole run.
    pub elapsed_ms: u64,
    /// The manifest that was written.
    pub manifest: Manifest,
}

/// What [`crate::convert::inspect`] reports for one document, without
/// rasterising it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub id: String,
    pub original_id: String,
    pub title: String,
    pub description: String,
    #[serde(with = "instant")]
    pub date: DateTime<Utc>,
    pub page_count: usize,
    /// Whether a sidecar file exists next to the PDF.
    pub has_sidecar: bool,
}

/// Render an instant the way the manifest stores it: UTC, millisecond
/// precision, `Z` suffix (`2024-05-01T09:30:00.000Z`).
pub fn format_instant(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter pinning the manifest's date format.
///
/// chrono's default serialisation drops trailing zero sub-seconds, which would
/// make the same mtime render differently depending on its value.
mod instant {
    use super::*;

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_instant(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> SlideRecord {
        SlideRecord {
            id: "rust-intro".into(),
            original_id: "Rust Intro".into(),
            title: "Rust Intro".into(),
            description: String::new(),
            date: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            location: None,
            thumbnail: "/images/slides/rust-intro/thumb.jpg".into(),
            page_count: 2,
            pdf_path: "/pdfs/Rust Intro.pdf".into(),
            thumbnails: vec![
                "/images/slides/rust-intro/thumb-1.jpg".into(),
                "/images/slides/rust-intro/thumb-2.jpg".into(),
            ],
        }
    }

    #[test]
    fn serialises_with_camel_case_and_millis() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["originalId"], "Rust Intro");
        assert_eq!(json["pageCount"], 2);
        assert_eq!(json["pdfPath"], "/pdfs/Rust Intro.pdf");
        assert_eq!(json["date"], "2024-05-01T09:30:00.000Z");
        assert!(json["location"].is_null());
        assert_eq!(json["description"], "");
    }

    #[test]
    fn parses_back_from_manifest_json() {
        let mut r = record();
        r.location = Some(Location {
            text: "RustConf".into(),
            url: "https://rustconf.com".into(),
        });
        let text = serde_json::to_string_pretty(&vec![r.clone()]).unwrap();
        let back: Manifest = serde_json::from_str(&text).unwrap();
        assert_eq!(back, vec![r]);
    }
}
