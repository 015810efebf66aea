use ::scraper::{ElementRef, Html, Selector};
use url::Url;

use super::article::Article;

const UNTITLED: &str = "Untitled";

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::error!("invalid selector {}: {:?}", css, e);
            None
        }
    }
}

/// Text nodes of an element, each trimmed, joined by single spaces.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every `href` attribute of an anchor, in document order.
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let Some(anchor) = selector("a[href]") else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    doc.select(&anchor)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.to_string())
        .collect()
}

/// Resolve `href` against `base` and drop the query string and fragment.
pub fn normalize_link(base: &Url, href: &str) -> Option<Url> {
    let mut url = base.join(href.trim()).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    Some(url)
}

/// HTTP(S) links that contain none of the denylisted markers.
pub fn is_candidate(link: &Url, denylist: &[String]) -> bool {
    if !matches!(link.scheme(), "http" | "https") {
        return false;
    }
    let text = link.as_str();
    !denylist
        .iter()
        .any(|marker| !marker.is_empty() && text.contains(marker.as_str()))
}

/// Title from the first `h1`, content from every `p`. Pages whose content is
/// not longer than `min_content_chars` are treated as junk.
pub fn parse_article(html: &str, url: &str, min_content_chars: usize) -> Option<Article> {
    let h1 = selector("h1")?;
    let paragraph = selector("p")?;
    let doc = Html::parse_document(html);

    let title = doc
        .select(&h1)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let content = doc
        .select(&paragraph)
        .map(element_text)
        .collect::<Vec<_>>()
        .join(" ");

    if content.chars().count() <= min_content_chars {
        return None;
    }

    Some(Article {
        title,
        url: url.to_string(),
        content,
        source: None,
    })
}
