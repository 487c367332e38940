//! Article text extraction from news URLs
//!
//! Paragraph text is taken from the first `<article>` element when the page
//! has one, otherwise from the whole document.

use crate::config::FetchConfig;
use newscheck_core::{Error, Result};
use regex::{Captures, Regex};
use std::time::Duration;
use tracing::debug;

/// Pulls paragraph text out of HTML
#[derive(Debug, Clone)]
pub struct ParagraphExtractor {
    hidden: Regex,
    article: Regex,
    paragraph: Regex,
    tag: Regex,
    entity: Regex,
}

impl ParagraphExtractor {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::internal(format!("Invalid extraction pattern: {}", e)))
        };

        Ok(Self {
            hidden: compile(
                r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>",
            )?,
            article: compile(r"(?is)<article\b[^>]*>(.*?)</article\s*>")?,
            paragraph: compile(r"(?is)<p\b[^>]*>(.*?)</p\s*>")?,
            tag: compile(r"(?s)<[^>]*>")?,
            entity: compile(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[a-zA-Z]{2,8});")?,
        })
    }

    /// Space-joined paragraph text, truncated to `max_chars` characters
    pub fn extract(&self, html: &str, max_chars: usize) -> String {
        let visible = self.hidden.replace_all(html, " ");
        let visible: &str = &visible;
        let scope = self
            .article
            .captures(visible)
            .and_then(|c| c.get(1))
            .map_or(visible, |m| m.as_str());

        let paragraphs: Vec<String> = self
            .paragraph
            .captures_iter(scope)
            .filter_map(|c| c.get(1))
            .map(|m| self.paragraph_text(m.as_str()))
            .filter(|p| !p.is_empty())
            .collect();

        paragraphs.join(" ").chars().take(max_chars).collect()
    }

    fn paragraph_text(&self, inner: &str) -> String {
        let stripped = self.tag.replace_all(inner, " ");
        let decoded = self.entity.replace_all(&stripped, |caps: &Captures| {
            decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        });
        decoded.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

fn decode_entity(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(|c: char| c == 'x' || c == 'X') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "aacute" => 'á',
        "eacute" => 'é',
        "iacute" => 'í',
        "oacute" => 'ó',
        "uacute" => 'ú',
        "Aacute" => 'Á',
        "Eacute" => 'É',
        "Iacute" => 'Í',
        "Oacute" => 'Ó',
        "Uacute" => 'Ú',
        "ntilde" => 'ñ',
        "Ntilde" => 'Ñ',
        "uuml" => 'ü',
        "Uuml" => 'Ü',
        "iexcl" => '¡',
        "iquest" => '¿',
        "laquo" => '«',
        "raquo" => '»',
        "ldquo" => '“',
        "rdquo" => '”',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "deg" => '°',
        _ => return None,
    };
    Some(c.to_string())
}

/// Downloads pages and extracts their paragraph text
#[derive(Debug, Clone)]
pub struct UrlTextFetcher {
    client: reqwest::Client,
    extractor: ParagraphExtractor,
    max_chars: usize,
}

impl UrlTextFetcher {
    pub fn new(fetch: &FetchConfig, max_chars: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .user_agent(fetch.user_agent.clone())
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            extractor: ParagraphExtractor::new()?,
            max_chars,
        })
    }

    /// Fetch `url` and return its article text; any failure is invalid input
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let unreadable = |e: reqwest::Error| Error::invalid_input(format!("Could not read URL: {}", e));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(unreadable)?
            .error_for_status()
            .map_err(unreadable)?;
        let html = response.text().await.map_err(unreadable)?;

        let text = self.extractor.extract(&html, self.max_chars);
        debug!(url, html_bytes = html.len(), text_chars = text.chars().count(), "Extracted URL text");
        Ok(text)
    }
}
