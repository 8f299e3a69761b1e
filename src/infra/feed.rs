//! Newsfeed parsing.
//!
//! Turns a decoded syndication document (RSS 2.0 or Atom 1.0) into a
//! [`NewsfeedDocument`]. Parsing is deliberately lenient: unknown elements
//! are skipped and unparseable timestamps become `None`. Only structural
//! problems (malformed XML, an unrecognized root element) are errors.

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::{Rfc2822, Rfc3339};

#[derive(Debug, Clone, Default)]
pub struct NewsfeedDocument {
    pub title: String,
    pub link: String,
    pub items: Vec<NewsfeedItem>,
}

#[derive(Debug, Clone, Default)]
pub struct NewsfeedItem {
    pub title: String,
    pub link: String,
    pub published: Option<OffsetDateTime>,
    pub summary: Option<String>,
}

#[derive(Debug, Error)]
pub enum FeedParseError {
    #[error("malformed feed xml: {0}")]
    Xml(String),
    #[error("unrecognized feed root element `{0}`")]
    UnknownRoot(String),
}

#[derive(Clone, Copy, PartialEq)]
enum FeedKind {
    Rss,
    Atom,
}

/// Parse an RSS 2.0 or Atom 1.0 document.
pub fn parse_feed(text: &str) -> Result<NewsfeedDocument, FeedParseError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut kind: Option<FeedKind> = None;
    let mut path: Vec<String> = Vec::new();
    let mut doc = NewsfeedDocument::default();
    let mut item: Option<NewsfeedItem> = None;

    loop {
        match reader.read_event(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e.name());
                if kind.is_none() {
                    kind = Some(match name.as_str() {
                        "rss" => FeedKind::Rss,
                        "feed" => FeedKind::Atom,
                        other => return Err(FeedParseError::UnknownRoot(other.to_string())),
                    });
                } else if is_item_element(kind, &name, &path) {
                    item = Some(NewsfeedItem::default());
                }
                if kind == Some(FeedKind::Atom) && name == "link" {
                    apply_atom_link(&reader, e, &path, &mut doc, &mut item);
                }
                path.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                let name = local_name(e.name());
                if kind == Some(FeedKind::Atom) && name == "link" {
                    apply_atom_link(&reader, e, &path, &mut doc, &mut item);
                }
            }
            Ok(Event::Text(ref t)) => {
                let text = t
                    .unescape_and_decode(&reader)
                    .map_err(|err| FeedParseError::Xml(err.to_string()))?;
                apply_text(kind, &path, text, &mut doc, &mut item);
            }
            Ok(Event::CData(ref t)) => {
                // The reader hands CDATA content back escaped; undo that so
                // markup inside the section survives verbatim.
                let text = t
                    .unescape_and_decode(&reader)
                    .map_err(|err| FeedParseError::Xml(err.to_string()))?;
                apply_text(kind, &path, text, &mut doc, &mut item);
            }
            Ok(Event::End(_)) => {
                let closed = path.pop();
                if let Some(closed) = closed {
                    if is_item_element(kind, &closed, &path) {
                        if let Some(finished) = item.take() {
                            doc.items.push(finished);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(FeedParseError::Xml(err.to_string())),
            Ok(_) => {}
        }
        buf.clear();
    }

    if kind.is_none() {
        return Err(FeedParseError::UnknownRoot(String::new()));
    }
    Ok(doc)
}

fn local_name(raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(raw);
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => name.into_owned(),
    }
}

/// True when `name` opens a feed item at the given parent path.
fn is_item_element(kind: Option<FeedKind>, name: &str, parent_path: &[String]) -> bool {
    match kind {
        Some(FeedKind::Rss) => name == "item" && path_is(parent_path, &["rss", "channel"]),
        Some(FeedKind::Atom) => name == "entry" && path_is(parent_path, &["feed"]),
        None => false,
    }
}

fn path_is(path: &[String], expected: &[&str]) -> bool {
    path.len() == expected.len() && path.iter().zip(expected).all(|(a, b)| a == b)
}

fn apply_atom_link<B: std::io::BufRead>(
    reader: &Reader<B>,
    element: &quick_xml::events::BytesStart<'_>,
    path: &[String],
    doc: &mut NewsfeedDocument,
    item: &mut Option<NewsfeedItem>,
) {
    let Some(href) = element.attributes().flatten().find_map(|attr| {
        (attr.key == b"href")
            .then(|| attr.unescape_and_decode_value(reader).ok())
            .flatten()
    }) else {
        return;
    };

    if path_is(path, &["feed", "entry"]) {
        if let Some(item) = item {
            item.link = href;
        }
    } else if path_is(path, &["feed"]) && doc.link.is_empty() {
        doc.link = href;
    }
}

fn apply_text(
    kind: Option<FeedKind>,
    path: &[String],
    text: String,
    doc: &mut NewsfeedDocument,
    item: &mut Option<NewsfeedItem>,
) {
    let Some(kind) = kind else { return };
    let Some(element) = path.last().map(String::as_str) else {
        return;
    };

    match kind {
        FeedKind::Rss => {
            if path_is(&path[..path.len() - 1], &["rss", "channel"]) {
                match element {
                    "title" => doc.title = text,
                    "link" => doc.link = text,
                    _ => {}
                }
            } else if path_is(&path[..path.len() - 1], &["rss", "channel", "item"]) {
                if let Some(item) = item {
                    match element {
                        "title" => item.title = text,
                        "link" => item.link = text,
                        "pubDate" => {
                            item.published = OffsetDateTime::parse(&text, &Rfc2822).ok();
                        }
                        "description" => item.summary = Some(text),
                        _ => {}
                    }
                }
            }
        }
        FeedKind::Atom => {
            if path_is(&path[..path.len() - 1], &["feed"]) {
                if element == "title" {
                    doc.title = text;
                }
            } else if path_is(&path[..path.len() - 1], &["feed", "entry"]) {
                if let Some(item) = item {
                    match element {
                        "title" => item.title = text,
                        "updated" | "published" => {
                            item.published = OffsetDateTime::parse(&text, &Rfc3339).ok();
                        }
                        "summary" => item.summary = Some(text),
                        _ => {}
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Weblog</title>
    <link>https://example.org/</link>
    <item>
      <title>First post</title>
      <link>https://example.org/posts/first</link>
      <pubDate>Mon, 12 Jan 2026 09:30:00 +0000</pubDate>
      <description><![CDATA[An <em>excerpt</em>]]></description>
    </item>
    <item>
      <title>Second post</title>
      <link>https://example.org/posts/second</link>
      <pubDate>not a date</pubDate>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Feed</title>
  <link href="https://example.org/atom.xml" rel="self"/>
  <entry>
    <title>Hello</title>
    <link href="https://example.org/posts/hello"/>
    <updated>2026-01-12T09:30:00Z</updated>
    <summary>Short note</summary>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_channel_and_items() {
        let doc = parse_feed(RSS).unwrap();
        assert_eq!(doc.title, "Example Weblog");
        assert_eq!(doc.link, "https://example.org/");
        assert_eq!(doc.items.len(), 2);

        let first = &doc.items[0];
        assert_eq!(first.title, "First post");
        assert_eq!(first.link, "https://example.org/posts/first");
        assert!(first.published.is_some());
        assert_eq!(first.summary.as_deref(), Some("An <em>excerpt</em>"));

        // Unparseable dates degrade to None rather than failing the feed.
        assert!(doc.items[1].published.is_none());
    }

    #[test]
    fn parses_atom_entries() {
        let doc = parse_feed(ATOM).unwrap();
        assert_eq!(doc.title, "Example Feed");
        assert_eq!(doc.link, "https://example.org/atom.xml");
        assert_eq!(doc.items.len(), 1);

        let entry = &doc.items[0];
        assert_eq!(entry.title, "Hello");
        assert_eq!(entry.link, "https://example.org/posts/hello");
        assert!(entry.published.is_some());
        assert_eq!(entry.summary.as_deref(), Some("Short note"));
    }

    #[test]
    fn rejects_unknown_root() {
        let err = parse_feed("<html><body/></html>").unwrap_err();
        assert!(matches!(err, FeedParseError::UnknownRoot(root) if root == "html"));
    }

    #[test]
    fn rejects_malformed_xml() {
        let err = parse_feed("<rss><channel><title>x</chan").unwrap_err();
        assert!(matches!(err, FeedParseError::Xml(_)));
    }
}
