use std::sync::LazyLock;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::Result;

/// Elements whose text is never part of a job description.
const STRIPPED_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "noscript"];

/// Candidate containers, most specific first.
const DESCRIPTION_SELECTORS: &[&str] = &[
    r#"div[class*="job-description" i], div[class*="description" i], div[class*="details" i], div[class*="posting-details" i]"#,
    r#"section[class*="job-description" i], section[class*="description" i], section[class*="details" i]"#,
    r#"div[id*="job-description" i], div[id*="description" i], div[id*="details" i]"#,
    "article",
    "main",
];

const MIN_DESCRIPTION_CHARS: usize = 100;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern must compile"));
static NON_PROSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,;!?-]").expect("prose pattern must compile"));

/// Source of full posting text for a link.
///
/// Best-effort by contract: failures come back as `None`, never as errors.
pub trait DescriptionSource {
    fn fetch(&self, url: &str) -> Option<String>;
}

impl<D: DescriptionSource + ?Sized> DescriptionSource for &D {
    fn fetch(&self, url: &str) -> Option<String> {
        (**self).fetch(url)
    }
}

pub struct DescriptionScraper {
    client: Client,
}

impl DescriptionScraper {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(10))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        Ok(DescriptionScraper { client })
    }

    fn get_random_user_agent(&self) -> &'static str {
        let uas = [
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
        ];
        let mut rng = rand::thread_rng();
        uas[rng.gen_range(0..uas.len())]
    }

    /// One timed GET of the posting page; any failure yields `None`.
    pub fn fetch_full_description(&self, url: &str) -> Option<String> {
        let request = self.client.get(url).header(USER_AGENT, self.get_random_user_agent());
        let resp = match request.send() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Could not fetch full description from {}: {}", url, e);
                return None;
            }
        };

        if resp.status().as_u16() != 200 {
            debug!("Description fetch for {} returned {}", url, resp.status());
            return None;
        }

        let html = match resp.text() {
            Ok(t) => t,
            Err(e) => {
                warn!("Could not read description body from {}: {}", url, e);
                return None;
            }
        };

        let description = parse_description(&html);
        if description.is_none() {
            debug!("No description container found at {}", url);
        }
        description
    }
}

impl DescriptionSource for DescriptionScraper {
    fn fetch(&self, url: &str) -> Option<String> {
        self.fetch_full_description(url)
    }
}

fn collect_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
            }
            node if is_stripped(node) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

fn is_stripped(node: &Node) -> bool {
    node.as_element()
        .map_or(false, |el| STRIPPED_TAGS.contains(&el.name()))
}

/// True when the element sits inside a tag that never holds posting text.
fn inside_stripped(element: ElementRef<'_>) -> bool {
    element.ancestors().any(|node| is_stripped(node.value()))
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    collect_text(element, &mut parts);
    parts.join(" ")
}

/// Picks the first description-like container with substantial text and
/// normalizes it to plain prose.
pub fn parse_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for selector_str in DESCRIPTION_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            warn!("Skipping unparsable selector {}", selector_str);
            continue;
        };
        let Some(element) = document.select(&selector).find(|el| !inside_stripped(*el)) else {
            continue;
        };
        let text = visible_text(element);
        if text.chars().count() > MIN_DESCRIPTION_CHARS {
            let normalized = WHITESPACE.replace_all(&text, " ");
            let cleaned = NON_PROSE.replace_all(&normalized, "");
            return Some(cleaned.trim().to_string());
        }
    }
    None
}
