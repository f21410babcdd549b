use std::collections::VecDeque;
use std::time::Duration;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::dedup::SeenLinks;
use crate::delay_manager::{Sleeper, ThreadSleeper, DEFAULT_PAGE_DELAY};
use crate::extractor::{self, Currency, NOT_AVAILABLE};
use crate::query_planner::SearchQuery;
use crate::request_client::{HttpMethod, HttpRequest, ReqwestTransport, RequestClient, Transport};
use crate::scraper::DescriptionSource;
use crate::url_filter::UrlShapeFilter;

pub const CUSTOM_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// A structured posting, keyed by `link`.
///
/// Field names follow the sink's column headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "Snippet")]
    pub snippet: String,
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Compensation")]
    pub compensation: String,
    #[serde(rename = "Compensation Currency", default)]
    pub compensation_currency: Currency,
}

/// One raw result from the search API.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    #[serde(default = "not_available")]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default = "not_available")]
    pub snippet: String,
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<SearchItem>,
}

/// Builds a record from a search item, preferring the title and snippet and
/// consulting the fetched description only for fields they do not mention.
pub fn enrich(item: &SearchItem, description: Option<String>) -> JobRecord {
    let full_text = format!("{} {}", item.title, item.snippet);
    let description_text = description.as_deref().unwrap_or_default();

    let mut location = extractor::extract_location(&full_text);
    if location == NOT_AVAILABLE && !description_text.is_empty() {
        location = extractor::extract_location(description_text);
    }

    let mut compensation = extractor::extract_compensation(&full_text);
    if compensation == NOT_AVAILABLE && !description_text.is_empty() {
        compensation = extractor::extract_compensation(description_text);
    }

    JobRecord {
        title: extractor::clean_title(&item.title),
        link: item.link.clone(),
        snippet: item.snippet.clone(),
        company: extractor::extract_company(&full_text, &item.link),
        location,
        compensation_currency: extractor::determine_currency(&compensation, description_text),
        compensation,
        description,
    }
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub endpoint: String,
    pub api_key: String,
    pub engine_id: String,
    pub page_size: usize,
    /// A query is abandoned once its start index passes this.
    pub per_query_page_cap: usize,
    pub page_delay: Duration,
}

impl SearchSettings {
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        SearchSettings {
            endpoint: CUSTOM_SEARCH_URL.to_string(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            page_size: 10,
            per_query_page_cap: 100,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }
}

/// Position within one query's result pages. Starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    pub start_index: usize,
    pub page_size: usize,
}

impl PaginationCursor {
    pub fn new(page_size: usize) -> Self {
        PaginationCursor { start_index: 1, page_size }
    }

    pub fn advance(&mut self, returned: usize) {
        self.start_index += returned;
    }
}

pub struct SearchEngine<T = ReqwestTransport, S = ThreadSleeper> {
    client: RequestClient<T, S>,
    settings: SearchSettings,
    descriptions: Option<Box<dyn DescriptionSource>>,
    url_filter: Option<UrlShapeFilter>,
}

impl<T: Transport, S: Sleeper> SearchEngine<T, S> {
    pub fn new(client: RequestClient<T, S>, settings: SearchSettings) -> Self {
        SearchEngine {
            client,
            settings,
            descriptions: None,
            url_filter: None,
        }
    }

    pub fn with_descriptions(mut self, source: Box<dyn DescriptionSource>) -> Self {
        self.descriptions = Some(source);
        self
    }

    pub fn with_url_filter(mut self, filter: UrlShapeFilter) -> Self {
        self.url_filter = Some(filter);
        self
    }

    /// Lazily walks `queries` in order, yielding at most `max_results`
    /// records with links not already in `seen`.
    pub fn run(
        &self,
        queries: Vec<SearchQuery>,
        max_results: usize,
        seen: SeenLinks,
    ) -> JobSearch<'_, T, S> {
        JobSearch {
            engine: self,
            queries: queries.into_iter().collect(),
            active: None,
            pending: VecDeque::new(),
            seen,
            emitted: 0,
            max_results,
            requests_made: 0,
        }
    }

    fn page_request(&self, query: &SearchQuery, cursor: &PaginationCursor) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.settings.endpoint.as_str())
            .query("q", query.query_string())
            .query("key", self.settings.api_key.as_str())
            .query("cx", self.settings.engine_id.as_str())
            .query("num", cursor.page_size.to_string())
            .query("start", cursor.start_index.to_string())
    }

    /// Fetches one page; `None` means the query is finished.
    fn fetch_page(
        &self,
        query: &SearchQuery,
        cursor: &PaginationCursor,
    ) -> Option<Vec<SearchItem>> {
        let request = self.page_request(query, cursor);
        let response = match self.client.send(&request) {
            Ok(resp) => resp,
            Err(e) => {
                error!("Request error for query {}: {}", query.query_string(), e);
                return None;
            }
        };

        if response.status_code != 200 {
            error!("Error {} for query: {}", response.status_code, query.query_string());
            return None;
        }

        match response.json::<SearchPage>() {
            Ok(page) => Some(page.items),
            Err(e) => {
                error!("Error decoding search response for {}: {}", query.query_string(), e);
                None
            }
        }
    }

    fn to_record(&self, item: &SearchItem) -> JobRecord {
        let description = self
            .descriptions
            .as_ref()
            .and_then(|source| source.fetch(&item.link));
        enrich(item, description)
    }
}

struct ActiveQuery {
    query: SearchQuery,
    cursor: PaginationCursor,
}

/// Iterator over one pipeline run.
pub struct JobSearch<'e, T, S> {
    engine: &'e SearchEngine<T, S>,
    queries: VecDeque<SearchQuery>,
    active: Option<ActiveQuery>,
    pending: VecDeque<(SearchItem, String)>,
    seen: SeenLinks,
    emitted: usize,
    max_results: usize,
    requests_made: usize,
}

impl<'e, T: Transport, S: Sleeper> JobSearch<'e, T, S> {
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Hands back the run's seen links, including everything emitted.
    pub fn into_seen(self) -> SeenLinks {
        self.seen
    }

    /// Loads the next non-empty page into `pending`. Returns false when every
    /// query is exhausted.
    fn load_next_page(&mut self) -> bool {
        loop {
            let Some(active) = self.active.as_mut() else {
                match self.queries.pop_front() {
                    Some(query) => {
                        info!("Searching: {}", query.query_string());
                        self.active = Some(ActiveQuery {
                            query,
                            cursor: PaginationCursor::new(self.engine.settings.page_size),
                        });
                        continue;
                    }
                    None => return false,
                }
            };

            if active.cursor.start_index > self.engine.settings.per_query_page_cap {
                info!("Page cap reached for {}", active.query.site);
                self.active = None;
                continue;
            }

            if self.requests_made > 0 {
                self.engine.client.sleeper().sleep(self.engine.settings.page_delay);
            }
            self.requests_made += 1;

            let Some(items) = self.engine.fetch_page(&active.query, &active.cursor) else {
                self.active = None;
                continue;
            };
            if items.is_empty() {
                info!("No more results for {}", active.query.site);
                self.active = None;
                continue;
            }

            active.cursor.advance(items.len());
            let site = active.query.site.clone();
            self.pending.extend(items.into_iter().map(|item| (item, site.clone())));
            return true;
        }
    }
}

impl<'e, T: Transport, S: Sleeper> Iterator for JobSearch<'e, T, S> {
    type Item = JobRecord;

    fn next(&mut self) -> Option<JobRecord> {
        loop {
            if self.emitted >= self.max_results {
                return None;
            }

            let Some((item, site)) = self.pending.pop_front() else {
                if !self.load_next_page() {
                    info!("Search finished with {} new job listings", self.emitted);
                    return None;
                }
                continue;
            };

            let link = item.link.trim();
            if link.is_empty() || self.seen.seen(link) {
                continue;
            }
            if let Some(filter) = &self.engine.url_filter {
                if !filter.accepts(link, &site) {
                    continue;
                }
            }

            self.seen.mark(link);
            let record = self.engine.to_record(&SearchItem {
                link: link.to_string(),
                ..item
            });
            self.emitted += 1;
            if self.emitted == self.max_results {
                info!("Reached maximum results limit: {}", self.max_results);
            }
            return Some(record);
        }
    }
}

impl<T: Transport, S: Sleeper> SearchEngine<T, S> {
    /// Convenience wrapper that drains a run and returns the records together
    /// with the updated seen links.
    pub fn search_all(
        &self,
        queries: Vec<SearchQuery>,
        max_results: usize,
        seen: SeenLinks,
    ) -> (Vec<JobRecord>, SeenLinks) {
        let mut search = self.run(queries, max_results, seen);
        let records: Vec<JobRecord> = search.by_ref().collect();
        if records.is_empty() {
            warn!("Search produced no new job listings");
        }
        (records, search.into_seen())
    }
}
