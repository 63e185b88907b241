use std::collections::HashSet;
use std::path::Path;

use opml::{Outline, OPML};

use crate::error::Result;

/// Read feed URLs from an OPML subscription list.
pub fn parse_opml_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    parse_opml(&content)
}

/// Feed URLs in document order, nested outlines flattened, duplicates removed.
pub fn parse_opml(content: &str) -> Result<Vec<String>> {
    let document = OPML::from_str(content)?;

    let mut urls = Vec::new();
    collect_urls(&document.body.outlines, &mut urls);

    let mut seen = HashSet::new();
    urls.retain(|url| seen.insert(url.clone()));
    Ok(urls)
}

fn collect_urls(outlines: &[Outline], urls: &mut Vec<String>) {
    for outline in outlines {
        if let Some(url) = outline.xml_url.as_deref().map(str::trim) {
            if !url.is_empty() {
                urls.push(url.to_string());
            }
        }
        collect_urls(&outline.outlines, urls);
    }
}
