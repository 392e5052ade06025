//! URL-safe identifiers derived from source file names.
//!
//! The identifier names the per-document image directory and appears in every
//! URL the site generates for a deck, so it must be stable across runs: the
//! same stem always yields the same identifier.
//!
//! Stems that slugify to almost nothing (`"!!"`, `"第1回"`, `"a"`) fall back
//! to [`FALLBACK_PREFIX`] plus the first six hex digits of the stem's MD5
//! digest. Two *different* stems can still slugify to the same identifier
//! (`"Intro Talk"` and `"intro_talk"`); callers detect that, the generator
//! does not.

use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix of hash-based fallback identifiers.
pub const FALLBACK_PREFIX: &str = "id-";

/// Slugs shorter than this are replaced by the hash fallback.
pub const MIN_SLUG_LEN: usize = 3;

/// Hex digits of the digest kept in a fallback identifier.
const HASH_LEN: usize = 6;

static RE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_\s-]").unwrap());
static RE_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_-]+").unwrap());

/// Derive the identifier for a file stem (file name without `.pdf`).
///
/// - `"My Talk_2024"` → `"my-talk-2024"`
/// - `"--Rust & WASM--"` → `"rust-wasm"`
/// - `"a"` → `"id-0cc175"`
pub fn slugify(stem: &str) -> String {
    let lower = stem.to_lowercase();
    let stripped = RE_UNSAFE.replace_all(&lower, "");
    let collapsed = RE_SEPARATORS.replace_all(&stripped, "-");
    let slug = collapsed.trim_matches('-');

    if slug.len() < MIN_SLUG_LEN {
        return fallback_id(stem);
    }
    slug.to_string()
}

fn fallback_id(stem: &str) -> String {
    let digest = format!("{:x}", Md5::digest(stem.as_bytes()));
    format!("{}{}", FALLBACK_PREFIX, &digest[..HASH_LEN])
}

/// `true` when every character of `id` is an unreserved URL path character.
pub fn is_url_safe(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}
