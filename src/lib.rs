pub mod config;
pub mod dedup;
pub mod delay_manager;
pub mod error;
pub mod extractor;
pub mod input_loader;
pub mod logger;
pub mod publisher;
pub mod query_planner;
pub mod request_client;
pub mod scraper;
pub mod search_engine;
pub mod sink;
pub mod url_filter;

#[cfg(test)]
mod testing;

// Exporting types for convenience
pub use config::{Config, PublisherConfig};
pub use dedup::SeenLinks;
pub use error::{Result, ScraperError};
pub use publisher::{EmployerDirectory, PublishReport, Publisher};
pub use query_planner::{QueryPlanner, SearchQuery};
pub use request_client::{HttpMethod, HttpResponse, RequestClient, Severity};
pub use scraper::{DescriptionScraper, DescriptionSource};
pub use search_engine::{JobRecord, JobSearch, SearchEngine, SearchSettings};
pub use sink::{CsvSink, RecordSink};
pub use url_filter::UrlShapeFilter;
