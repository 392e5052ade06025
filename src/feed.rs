//! RSS 2.0 feed over the manifest.
//!
//! The feed is a derived view: it is rebuilt from the manifest on every run
//! and never read back. [`render_feed`] is pure; [`write_feed`] adds the
//! atomic file write.

use crate::config::FeedConfig;
use crate::error::SlidesError;
use crate::output::SlideRecord;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use tracing::info;

/// Render the manifest as an RSS 2.0 document, newest deck first.
///
/// `lastBuildDate` is the newest record's date, or now for an empty
/// manifest, so an unchanged manifest renders to an unchanged feed.
pub fn render_feed(records: &[SlideRecord], feed: &FeedConfig) -> String {
    let mut sorted: Vec<&SlideRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));

    let last_build = sorted.first().map(|r| r.date).unwrap_or_else(Utc::now);

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\">\n");
    xml.push_str("  <channel>\n");
    let _ = writeln!(xml, "    <title>{}</title>", escape(&feed.title));
    let _ = writeln!(xml, "    <link>{}</link>", escape(&feed.base_url));
    let _ = writeln!(xml, "    <description>{}</description>", escape(&feed.description));
    let _ = writeln!(xml, "    <language>{}</language>", escape(&feed.language));
    let _ = writeln!(xml, "    <lastBuildDate>{}</lastBuildDate>", rfc2822(&last_build));
    let _ = writeln!(
        xml,
        "    <atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\"/>",
        escape(&feed.self_url())
    );

    for record in sorted {
        let link = feed.slide_url(&record.id);
        xml.push_str("    <item>\n");
        let _ = writeln!(xml, "      <title>{}</title>", escape(&record.title));
        let _ = writeln!(xml, "      <link>{}</link>", escape(&link));
        let _ = writeln!(xml, "      <guid isPermaLink=\"true\">{}</guid>", escape(&link));
        let _ = writeln!(xml, "      <pubDate>{}</pubDate>", rfc2822(&record.date));
        let _ = writeln!(
            xml,
            "      <description>{}</description>",
            escape(&item_html(record, feed))
        );
        xml.push_str("    </item>\n");
    }

    xml.push_str("  </channel>\n");
    xml.push_str("</rss>\n");
    xml
}

/// Render and atomically write the feed to `feed.output_path`.
pub async fn write_feed(records: &[SlideRecord], feed: &FeedConfig) -> Result<(), SlidesError> {
    let xml = render_feed(records, feed);
    crate::convert::write_atomic(&feed.output_path, xml.into_bytes()).await?;
    info!("Wrote feed with {} items to {}", records.len(), feed.output_path.display());
    Ok(())
}

/// HTML body of one item: thumbnail, description, page count, location.
fn item_html(record: &SlideRecord, feed: &FeedConfig) -> String {
    let mut html = format!(
        "<img src=\"{}\" alt=\"{}\"/>",
        escape(&feed.absolute_url(&record.thumbnail)),
        escape(&record.title)
    );
    if !record.description.is_empty() {
        let _ = write!(html, "<p>{}</p>", escape(&record.description));
    }
    let _ = write!(html, "<p>{} pages</p>", record.page_count);
    if let Some(ref loc) = record.location {
        let _ = write!(
            html,
            "<p>Location: <a href=\"{}\">{}</a></p>",
            escape(&loc.url),
            escape(&loc.text)
        );
    }
    html
}

/// RSS dates are RFC 2822 (`Fri, 1 Mar 2024 12:00:00 +0000`).
fn rfc2822(at: &DateTime<Utc>) -> String {
    at.to_rfc2822()
}

/// Escape the five XML special characters.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Location;
    use chrono::TimeZone;

    fn record(id: &str, day: u32) -> SlideRecord {
        SlideRecord {
            id: id.into(),
            original_id: id.into(),
            title: format!("Deck {id}"),
            description: String::new(),
            date: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            location: None,
            thumbnail: format!("/images/slides/{id}/thumb.jpg"),
            page_count: 3,
            pdf_path: format!("/pdfs/{id}.pdf"),
            thumbnails: (1..=3)
                .map(|n| format!("/images/slides/{id}/thumb-{n}.jpg"))
                .collect(),
        }
    }

    fn feed() -> FeedConfig {
        FeedConfig::new("https://example.org/talks/").title("Talks & Slides")
    }

    #[test]
    fn items_newest_first_and_last_build_is_max() {
        let d1 = record("one", 1);
        let d2 = record("two", 2);
        let d3 = record("three", 3);
        let manifest = vec![d2.clone(), d1.clone(), d3.clone()];

        let xml = render_feed(&manifest, &feed());

        let pos = |id: &str| xml.find(&format!("<link>https://example.org/talks/slides/{id}</link>")).unwrap();
        assert!(pos("three") < pos("two"));
        assert!(pos("two") < pos("one"));
        assert!(xml.contains(&format!("<lastBuildDate>{}</lastBuildDate>", d3.date.to_rfc2822())));
        // The manifest itself is untouched.
        assert_eq!(manifest[0].id, "two");
    }

    #[test]
    fn channel_has_required_elements() {
        let xml = render_feed(&[record("one", 1)], &feed());
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<title>Talks &amp; Slides</title>"));
        assert!(xml.contains("<link>https://example.org/talks/</link>"));
        assert!(xml.contains("<language>en</language>"));
        assert!(xml.contains(
            "<atom:link href=\"https://example.org/talks/rss.xml\" rel=\"self\" type=\"application/rss+xml\"/>"
        ));
        assert!(xml.contains(
            "<guid isPermaLink=\"true\">https://example.org/talks/slides/one</guid>"
        ));
        assert!(xml.contains("1 Mar 2024 12:00:00 +0000</pubDate>"));
    }

    #[test]
    fn description_embeds_thumbnail_pages_and_location() {
        let mut r = record("one", 1);
        r.description = "Intro <to> Rust".into();
        r.location = Some(Location {
            text: "Rust Tokyo".into(),
            url: "https://rust.tokyo".into(),
        });
        let xml = render_feed(&[r], &feed());
        assert!(xml.contains(
            "&lt;img src=&quot;https://example.org/talks/images/slides/one/thumb.jpg&quot;"
        ));
        assert!(xml.contains("Intro &amp;lt;to&amp;gt; Rust"));
        assert!(xml.contains("3 pages"));
        assert!(xml.contains("Rust Tokyo&lt;/a&gt;"));
    }

    #[test]
    fn empty_manifest_still_renders_channel() {
        let xml = render_feed(&[], &feed());
        assert!(xml.contains("<lastBuildDate>"));
        assert!(!xml.contains("<item>"));
    }

    #[test]
    fn escape_handles_all_specials() {
        assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&apos;&amp;&apos;&lt;/a&gt;");
    }
}
