//! Values the feed parser does not expose, read straight from the document text.
//!
//! `bild:premium` lives in a foreign namespace and the `medium` attribute of
//! `media:content` has no place in the parsed model, so both are recovered here
//! and joined back to parsed entries by guid, link or media URL.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use url::Url;

/// Declared attributes of one `media:content` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaAttributes {
    pub medium: Option<String>,
    pub credit: Option<String>,
}

#[derive(Debug, Default)]
pub struct DocumentMarkup {
    /// Premium marker text keyed by the guid and the link of its item.
    pub premium: HashMap<String, String>,
    /// Keyed by the normalized media URL.
    pub media: HashMap<String, MediaAttributes>,
}

impl DocumentMarkup {
    pub fn premium_for(&self, guid: Option<&str>, link: Option<&str>) -> Option<String> {
        guid.and_then(|g| self.premium.get(g))
            .or_else(|| link.and_then(|l| self.premium.get(l)))
            .cloned()
    }

    pub fn media_for(&self, url: &str) -> Option<&MediaAttributes> {
        self.media.get(url)
    }
}

struct Patterns {
    item: Regex,
    premium: Regex,
    key: Regex,
    media_content: Regex,
    attribute: Regex,
    credit: Regex,
}

static PATTERNS: OnceLock<Result<Patterns, regex::Error>> = OnceLock::new();

fn patterns() -> Option<&'static Patterns> {
    let compiled = PATTERNS.get_or_init(|| {
        Ok(Patterns {
            item: Regex::new(r"(?s)<item\b.*?</item>")?,
            premium: Regex::new(
                r"(?s)<bild:premium\b[^>]*>\s*(?:<!\[CDATA\[(.*?)\]\]>|(.*?))\s*</bild:premium>",
            )?,
            key: Regex::new(
                r"(?s)<(?:guid|link)\b[^>]*>\s*(?:<!\[CDATA\[(.*?)\]\]>|(.*?))\s*</(?:guid|link)>",
            )?,
            media_content: Regex::new(r"(?s)<media:content\b([^>]*?)(?:/>|>(.*?)</media:content>)")?,
            attribute: Regex::new(r#"([\w:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
            credit: Regex::new(
                r"(?s)<media:credit\b[^>]*>\s*(?:<!\[CDATA\[(.*?)\]\]>|(.*?))\s*</media:credit>",
            )?,
        })
    });

    match compiled {
        Ok(patterns) => Some(patterns),
        Err(e) => {
            tracing::error!("Feed markup patterns failed to compile: {}", e);
            None
        }
    }
}

/// Scan a raw feed document for premium markers and media attributes.
pub fn scan(document: &[u8]) -> DocumentMarkup {
    let mut markup = DocumentMarkup::default();

    let text = String::from_utf8_lossy(document);
    let has_premium = text.contains("bild:premium");
    let has_media = text.contains("media:content");
    if !has_premium && !has_media {
        return markup;
    }
    let Some(patterns) = patterns() else {
        return markup;
    };

    if has_premium {
        for block in patterns.item.find_iter(&text) {
            let block = block.as_str();
            let Some(value) = patterns.premium.captures(block).map(|c| element_text(&c)) else {
                continue;
            };
            for key in patterns.key.captures_iter(block).map(|c| element_text(&c)) {
                if !key.is_empty() {
                    markup.premium.insert(key, value.clone());
                }
            }
        }
    }

    if has_media {
        for content in patterns.media_content.captures_iter(&text) {
            let attributes = content.get(1).map_or("", |m| m.as_str());
            let mut url = None;
            let mut medium = None;
            for attribute in patterns.attribute.captures_iter(attributes) {
                let value = attribute
                    .get(2)
                    .or_else(|| attribute.get(3))
                    .map(|v| unescape(v.as_str().trim()))
                    .filter(|v| !v.is_empty());
                match attribute.get(1).map(|n| n.as_str()) {
                    Some("url") => url = value,
                    Some("medium") => medium = value,
                    _ => {}
                }
            }
            let Some(url) = url else {
                continue;
            };

            let credit = content
                .get(2)
                .and_then(|body| patterns.credit.captures(body.as_str()))
                .map(|c| element_text(&c))
                .filter(|c| !c.is_empty());

            markup
                .media
                .entry(media_key(&url))
                .or_insert(MediaAttributes { medium, credit });
        }
    }

    markup
}

/// Normalized form of a media URL, matching what the parser hands back.
pub fn media_key(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

/// CDATA sections are taken literally; plain text is entity-decoded.
fn element_text(captures: &Captures) -> String {
    match (captures.get(1), captures.get(2)) {
        (Some(cdata), _) => cdata.as_str().trim().to_string(),
        (None, Some(text)) => unescape(text.as_str().trim()),
        (None, None) => String::new(),
    }
}

/// Decode the predefined XML entities and numeric character references.
/// Anything unrecognised is kept as written.
pub fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail
            .find(';')
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}
