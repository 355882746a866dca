//! Small helpers over `scraper` shared by the platform adapters.

use scraper::{ElementRef, Html, Selector};
use url::Url;

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::debug!(css, error = ?e, "invalid selector");
            None
        }
    }
}

/// Whitespace-trimmed text of an element.
pub fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed text of the first match that has any.
pub fn first_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .map(|el| text_of(&el))
        .find(|text| !text.is_empty())
}

/// Attribute value of the first match carrying it.
pub fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Non-empty trimmed texts of every match, in document order.
pub fn all_texts(document: &Html, css: &str) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };
    document
        .select(&sel)
        .map(|el| text_of(&el))
        .filter(|t| !t.is_empty())
        .collect()
}

/// `(text, href)` for every anchor match with an href, in document order.
pub fn anchors(document: &Html, css: &str) -> Vec<(String, String)> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|el| {
            let href = el.value().attr("href")?.trim();
            if href.is_empty() || href.starts_with("javascript") {
                return None;
            }
            Some((text_of(&el), href.to_string()))
        })
        .collect()
}

/// Body text of the first matching container: its `<p>` children joined
/// with blank lines, or the container's raw text when it has none.
pub fn paragraphs(document: &Html, css: &str) -> Option<String> {
    let container_sel = selector(css)?;
    let p_sel = selector("p")?;
    let container = document.select(&container_sel).next()?;

    let lines: Vec<String> = container
        .select(&p_sel)
        .map(|p| text_of(&p))
        .filter(|line| !line.is_empty())
        .collect();

    let body = if lines.is_empty() {
        text_of(&container)
    } else {
        lines.join("\n\n")
    };

    (!body.is_empty()).then_some(body)
}

/// Resolve protocol-relative, site-relative and relative hrefs against a page URL.
pub fn resolve(base: &Url, href: &str) -> Option<Url> {
    base.join(href).ok()
}
