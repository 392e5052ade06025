//! Sidecar metadata: optional `{stem}.json` next to each PDF.
//!
//! ```json
//! {
//!   "title": "Async Rust in Practice",
//!   "description": "Talk given at the spring meetup",
//!   "date": "2024-04-18T19:00:00+09:00",
//!   "location": { "text": "Rust Tokyo", "url": "https://rust.tokyo" }
//! }
//! ```
//!
//! Every field is optional. A sidecar can only ever *improve* a record: a
//! missing file falls back quietly, and an unreadable or malformed one is
//! logged and treated as empty. A `location` of the wrong shape is dropped on
//! its own. A sidecar never fails the document.

use crate::error::MetadataError;
use crate::output::Location;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extension of sidecar descriptors.
pub const SIDECAR_EXTENSION: &str = "json";

/// Parsed sidecar overlay. Absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sidecar {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub location: Option<Location>,
}

/// On-disk shape. `location` stays untyped so a bad value is dropped alone.
#[derive(Default, Deserialize)]
#[serde(default)]
struct RawSidecar {
    title: Option<String>,
    description: Option<String>,
    date: Option<String>,
    location: Option<serde_json::Value>,
}

impl RawSidecar {
    fn into_sidecar(self, path: &Path) -> Sidecar {
        let location = self.location.and_then(|value| {
            serde_json::from_value::<Option<Location>>(value)
                .map_err(|source| {
                    warn!(
                        "{}",
                        MetadataError::InvalidLocation {
                            path: path.to_path_buf(),
                            source,
                        }
                    )
                })
                .ok()
                .flatten()
        });
        Sidecar {
            title: self.title,
            description: self.description,
            date: self.date,
            location,
        }
    }
}

/// Defaults derived from the PDF itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    pub title: String,
    pub modified: DateTime<Utc>,
}

/// The merged result used to build a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: Option<Location>,
}

/// Path of the sidecar for `pdf`: same stem, `.json` extension.
pub fn sidecar_path(pdf: &Path) -> PathBuf {
    pdf.with_extension(SIDECAR_EXTENSION)
}

/// Title derived from a file stem: `-`/`_` become spaces and every letter
/// that starts a word gets upper-cased. Any non-alphanumeric character ends a
/// word (`"rust.tokyo-meetup"` → `"Rust.Tokyo Meetup"`).
pub fn default_title(stem: &str) -> String {
    let mut title = String::with_capacity(stem.len());
    let mut word_start = true;
    for c in stem.chars() {
        let c = if c == '-' || c == '_' { ' ' } else { c };
        if word_start && c.is_alphanumeric() {
            title.extend(c.to_uppercase());
        } else {
            title.push(c);
        }
        word_start = !c.is_alphanumeric();
    }
    title
}

/// Read the PDF's modification time and derive its default title.
pub async fn defaults_for(pdf: &Path, stem: &str) -> Result<Defaults, std::io::Error> {
    let meta = tokio::fs::metadata(pdf).await?;
    Ok(Defaults {
        title: default_title(stem),
        modified: DateTime::<Utc>::from(meta.modified()?),
    })
}

/// Load the sidecar for `pdf`.
///
/// `Ok(None)` when there is no sidecar; `Err` when one exists but cannot be
/// used. Callers treat both as an empty overlay.
pub async fn load_sidecar(pdf: &Path) -> Result<Option<Sidecar>, MetadataError> {
    let path = sidecar_path(pdf);
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No sidecar at {}; using defaults", path.display());
            return Ok(None);
        }
        Err(source) => return Err(MetadataError::Unreadable { path, source }),
    };
    let raw: RawSidecar = serde_json::from_str(&text)
        .map_err(|source| MetadataError::Malformed { path: path.clone(), source })?;
    debug!("Loaded sidecar {}", path.display());
    Ok(Some(raw.into_sidecar(&path)))
}

/// Load the sidecar, logging and discarding any problem with it.
pub async fn load_sidecar_or_default(pdf: &Path) -> Sidecar {
    match load_sidecar(pdf).await {
        Ok(found) => found.unwrap_or_default(),
        Err(e) => {
            warn!("{}; using defaults", e);
            Sidecar::default()
        }
    }
}

/// Overlay `sidecar` on `defaults`.
///
/// Empty strings count as absent. A `date` that does not parse is logged and
/// replaced by the file's modification time.
pub fn merge(sidecar: Sidecar, defaults: Defaults, sidecar_path: &Path) -> Merged {
    let date = match sidecar.date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_date(raw).unwrap_or_else(|| {
            warn!(
                "{}; using file modification time",
                MetadataError::InvalidDate {
                    path: sidecar_path.to_path_buf(),
                    value: raw.to_string(),
                }
            );
            defaults.modified
        }),
        _ => defaults.modified,
    };

    Merged {
        title: sidecar
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(defaults.title),
        description: sidecar.description.unwrap_or_default(),
        date,
        location: sidecar.location,
    }
}

/// Parse the ISO-8601 shapes people actually write in sidecars.
///
/// Timestamps with an offset are converted to UTC. Timestamps without one and
/// bare dates are taken as UTC, so the result does not depend on the
/// machine's time zone.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn defaults() -> Defaults {
        Defaults {
            title: "Fallback Title".into(),
            modified: Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn default_title_capitalises_words() {
        assert_eq!(default_title("rust_meetup-2024"), "Rust Meetup 2024");
        assert_eq!(default_title("already Fine"), "Already Fine");
        assert_eq!(default_title("ünicode-talk"), "Ünicode Talk");
    }

    #[test]
    fn default_title_capitalises_after_punctuation() {
        assert_eq!(default_title("rust.tokyo-meetup"), "Rust.Tokyo Meetup");
        assert_eq!(default_title("q&a_session"), "Q&A Session");
        assert_eq!(default_title("v2.0-launch"), "V2.0 Launch");
    }

    #[test]
    fn sidecar_path_replaces_extension() {
        assert_eq!(sidecar_path(Path::new("/d/talk.PDF")), PathBuf::from("/d/talk.json"));
    }

    #[test]
    fn title_only_keeps_file_date() {
        let sidecar = Sidecar {
            title: Some("T".into()),
            ..Default::default()
        };
        let merged = merge(sidecar, defaults(), Path::new("t.json"));
        assert_eq!(merged.title, "T");
        assert_eq!(merged.description, "");
        assert_eq!(merged.date, defaults().modified);
        assert!(merged.location.is_none());
    }

    #[test]
    fn empty_title_falls_back() {
        let sidecar = Sidecar {
            title: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(merge(sidecar, defaults(), Path::new("t.json")).title, "Fallback Title");
    }

    #[test]
    fn bad_date_falls_back_to_mtime() {
        let sidecar = Sidecar {
            date: Some("sometime in spring".into()),
            ..Default::default()
        };
        assert_eq!(merge(sidecar, defaults(), Path::new("t.json")).date, defaults().modified);
    }

    #[test]
    fn parses_common_date_shapes() {
        let utc = |y, m, d, h, mi| Utc.with_ymd_and_hms(y, m, d, h, mi, 0).unwrap();
        assert_eq!(parse_date("2024-04-18T19:00:00+09:00"), Some(utc(2024, 4, 18, 10, 0)));
        assert_eq!(parse_date("2024-04-18T10:00:00Z"), Some(utc(2024, 4, 18, 10, 0)));
        assert_eq!(parse_date("2024-04-18T10:00:00"), Some(utc(2024, 4, 18, 10, 0)));
        assert_eq!(parse_date("2024-04-18T10:00"), Some(utc(2024, 4, 18, 10, 0)));
        assert_eq!(parse_date("2024-04-18"), Some(utc(2024, 4, 18, 0, 0)));
        assert_eq!(parse_date("18/04/2024"), None);
    }

    #[tokio::test]
    async fn missing_sidecar_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_sidecar(&dir.path().join("a.pdf")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_sidecar_is_reported_then_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("a.pdf");
        std::fs::write(dir.path().join("a.json"), "{ not json").unwrap();

        let err = load_sidecar(&pdf).await.unwrap_err();
        assert!(matches!(err, MetadataError::Malformed { .. }));
        assert_eq!(load_sidecar_or_default(&pdf).await, Sidecar::default());
    }

    #[tokio::test]
    async fn full_sidecar_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("a.pdf");
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"title":"Async","description":"d","date":"2024-04-18",
                "location":{"text":"Rust Tokyo","url":"https://rust.tokyo"},"extra":1}"#,
        )
        .unwrap();
        let s = load_sidecar(&pdf).await.unwrap().unwrap();
        assert_eq!(s.title.as_deref(), Some("Async"));
        assert_eq!(s.location.unwrap().text, "Rust Tokyo");
    }

    #[tokio::test]
    async fn partial_location_is_dropped_alone() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("a.pdf");
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"title":"Kept?","date":"2024-04-18","location":{"text":"Tokyo"}}"#,
        )
        .unwrap();

        let s = load_sidecar(&pdf).await.unwrap().unwrap();
        assert_eq!(s.title.as_deref(), Some("Kept?"));
        assert_eq!(s.date.as_deref(), Some("2024-04-18"));
        assert_eq!(s.location, None);
    }

    #[tokio::test]
    async fn null_location_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("a.pdf");
        std::fs::write(dir.path().join("a.json"), r#"{"location":null}"#).unwrap();
        assert_eq!(load_sidecar(&pdf).await.unwrap(), Some(Sidecar::default()));
    }
}
