use std::collections::HashMap;

use log::debug;
use regex::Regex;

use crate::error::{Result, ScraperError};

/// Trailing path segments that point at listing pages rather than postings.
const LISTING_SEGMENTS: &[&str] = &["apply", "job-board", "jobs", "careers"];

/// Opt-in per-site check that a link looks like a single posting.
///
/// Sites without a registered pattern accept every link.
#[derive(Debug, Clone, Default)]
pub struct UrlShapeFilter {
    patterns: HashMap<String, Regex>,
}

impl UrlShapeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Posting shapes for lever.co, greenhouse.io and ashbyhq.com.
    pub fn with_known_boards() -> Result<Self> {
        UrlShapeFilter::new()
            .with_pattern("lever.co", r"^https?://[^/]+\.lever\.co/[^/]+/[a-z0-9-]+/?$")?
            .with_pattern("greenhouse.io", r"^https?://[^/]+\.greenhouse\.io/[^/]+/jobs/[0-9]+/?$")?
            .with_pattern("boards.greenhouse.io", r"^https?://boards\.greenhouse\.io/[^/]+/jobs/[0-9]+/?$")?
            .with_pattern("jobs.ashbyhq.com", r"^https?://jobs\.ashbyhq\.com/[^/]+/[a-z0-9-]+/?$")
    }

    pub fn with_pattern(mut self, site: &str, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| ScraperError::InvalidConfig {
            key: "URL_SHAPE_FILTER",
            value: format!("{}: {}", site, e),
        })?;
        self.patterns.insert(site.trim().to_ascii_lowercase(), regex);
        Ok(self)
    }

    pub fn accepts(&self, link: &str, site: &str) -> bool {
        let Some(pattern) = self.patterns.get(&site.trim().to_ascii_lowercase()) else {
            return true;
        };

        let link = link.trim().to_ascii_lowercase();
        let last_segment = link
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();

        let accepted = pattern.is_match(&link) && !LISTING_SEGMENTS.contains(&last_segment);
        if !accepted {
            debug!("Rejected {} as not a {} posting", link, site);
        }
        accepted
    }
}
