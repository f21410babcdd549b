use job_scraper_lib::{delay_manager, input_loader, logger, sink};
use job_scraper_lib::{
    Config, CsvSink, DescriptionScraper, QueryPlanner, RecordSink, RequestClient, SearchEngine,
    SearchSettings, SeenLinks, UrlShapeFilter,
};
use job_scraper_lib::sink::BatchSettings;

use std::error::Error;
use log::{info, warn, error};
use uuid::Uuid;

fn main() -> Result<(), Box<dyn Error>> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            logger::init(log::LevelFilter::Info);
            error!("Configuration error: {}", e);
            return Err(e.into());
        }
    };
    logger::init(config.log_level);

    let run_id = Uuid::new_v4();
    info!("Starting job search run {}...", run_id);

    // 1. Seed dedup state from the sink and any extra export
    let mut record_sink = CsvSink::new(&config.sink_path);
    let mut seen: SeenLinks = record_sink.existing_links()?.into_iter().collect();
    if let Some(seed_file) = &config.seed_links_file {
        seen.extend(input_loader::load_links(seed_file));
    }
    info!("{} links already known", seen.len());

    // 2. Plan queries
    let queries = QueryPlanner::new()
        .expand_roles(config.expand_roles)
        .split_locations(config.split_locations)
        .required_terms(&config.required_terms)
        .excluded_phrases(&config.excluded_phrases)
        .plan(&config.job_sites, &config.locations, &config.job_roles);
    if queries.is_empty() {
        warn!("No queries planned. Set JOB_SITES, LOCATIONS and JOB_ROLES.");
        return Ok(());
    }
    info!("Planned {} queries", queries.len());

    // 3. Initialize engines
    let mut settings = SearchSettings::new(&config.google_api_key, &config.search_engine_id);
    settings.page_delay = config.page_delay;
    let mut engine = SearchEngine::new(RequestClient::from_defaults()?, settings);
    if config.fetch_descriptions {
        engine = engine.with_descriptions(Box::new(DescriptionScraper::new()?));
    }
    if config.url_shape_filter {
        engine = engine.with_url_filter(UrlShapeFilter::with_known_boards()?);
    }

    // 4. Search
    let (records, _seen) = engine.search_all(queries, config.max_results, seen);
    info!("Run {} found {} new job listings", run_id, records.len());

    if let Some(snapshot) = &config.json_snapshot {
        if let Err(e) = sink::write_json_snapshot(&records, snapshot) {
            error!("Failed to write JSON snapshot: {}", e);
        }
    }

    // 5. Persist
    let batch = BatchSettings {
        batch_size: config.sink_batch_size,
        pause: config.sink_batch_pause,
    };
    let saved = sink::save_new_records(
        &mut record_sink,
        &records,
        &batch,
        &delay_manager::ThreadSleeper,
    )?;
    info!("Run {} complete. {} records written to {:?}", run_id, saved, record_sink.path());

    Ok(())
}
