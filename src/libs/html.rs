//! Markup lookups used by the metadata resolvers.
//!
//! Every lookup fails closed: a pattern that matches nothing, or matches several
//! distinct values, is reported as an unparsable page rather than guessed at.

use crate::libs::errors::InstallError;
use crate::log_debug;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

fn selector(page: &str, css: &str) -> Result<Selector, InstallError> {
    Selector::parse(css).map_err(|e| InstallError::parse(page, format!("selector '{css}': {e:?}")))
}

/// Compiles a resolver pattern; a bad pattern is reported against the page it was meant for.
pub fn pattern(page: &str, re: &str) -> Result<Regex, InstallError> {
    Regex::new(re).map_err(|e| InstallError::parse(page, format!("pattern /{re}/: {e}")))
}

/// Collapses duplicate matches and insists on exactly one distinct value.
pub fn single_match(page: &str, what: &str, matches: Vec<String>) -> Result<String, InstallError> {
    let mut distinct: Vec<String> = Vec::new();
    for candidate in matches {
        if !distinct.contains(&candidate) {
            distinct.push(candidate);
        }
    }
    match distinct.len() {
        1 => Ok(distinct.remove(0)),
        0 => Err(InstallError::parse(page, what)),
        n => {
            log_debug!("[SI::Html] {} candidates for {} on {}: {:?}", n, what, page, distinct);
            Err(InstallError::parse(page, format!("{what} (ambiguous, {n} matches)")))
        }
    }
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Href of the anchor whose visible text is exactly `text`.
pub fn anchor_href_by_text(body: &str, page: &str, text: &str) -> Result<String, InstallError> {
    let document = Html::parse_document(body);
    let anchors = selector(page, "a[href]")?;
    let hrefs = document
        .select(&anchors)
        .filter(|a| element_text(a) == text)
        .filter_map(|a| a.value().attr("href").map(str::to_string))
        .collect();
    single_match(page, &format!("the '{text}' download link"), hrefs)
}

/// Href of the anchor whose visible text matches `pattern`.
pub fn anchor_href_by_text_matching(body: &str, page: &str, pattern: &Regex) -> Result<String, InstallError> {
    let document = Html::parse_document(body);
    let anchors = selector(page, "a[href]")?;
    let hrefs = document
        .select(&anchors)
        .filter(|a| pattern.is_match(&element_text(a)))
        .filter_map(|a| a.value().attr("href").map(str::to_string))
        .collect();
    single_match(page, &format!("a link labelled /{}/", pattern.as_str()), hrefs)
}

/// Href of the anchor whose target matches `pattern`.
pub fn anchor_href_matching(body: &str, page: &str, pattern: &Regex) -> Result<String, InstallError> {
    let document = Html::parse_document(body);
    let anchors = selector(page, "a[href]")?;
    let hrefs = document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| pattern.is_match(href))
        .map(str::to_string)
        .collect();
    single_match(page, &format!("a link to /{}/", pattern.as_str()), hrefs)
}

/// Href of the element wrapping the button whose text matches `pattern`.
/// Vendors gate downloads behind `<a href=...><button>...</button></a>`.
pub fn button_parent_href(body: &str, page: &str, pattern: &Regex) -> Result<String, InstallError> {
    let document = Html::parse_document(body);
    let buttons = selector(page, "button")?;
    let hrefs = document
        .select(&buttons)
        .filter(|b| pattern.is_match(&element_text(b)))
        .filter_map(|b| b.parent().and_then(ElementRef::wrap))
        .filter_map(|parent| parent.value().attr("href").map(str::to_string))
        .collect();
    single_match(page, &format!("the /{}/ button", pattern.as_str()), hrefs)
}

/// Resolves a possibly relative or protocol-relative href against the page it came from.
pub fn resolve_href(base: &str, href: &str) -> Result<String, InstallError> {
    let base_url = Url::parse(base).map_err(|e| InstallError::parse(base, format!("page url: {e}")))?;
    base_url
        .join(href)
        .map(String::from)
        .map_err(|e| InstallError::parse(base, format!("link '{href}': {e}")))
}

/// First whitespace-delimited token of a checksum file.
pub fn first_token(body: &str, page: &str) -> Result<String, InstallError> {
    body.split_whitespace()
        .next()
        .map(str::to_string)
        .ok_or_else(|| InstallError::parse(page, "a checksum"))
}
