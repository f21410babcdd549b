use job_scraper_lib::{input_loader, logger};
use job_scraper_lib::{EmployerDirectory, Publisher, PublisherConfig, RequestClient};

use std::error::Error;
use log::{info, error};

fn main() -> Result<(), Box<dyn Error>> {
    let config = match PublisherConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            logger::init(log::LevelFilter::Info);
            error!("Configuration error: {}", e);
            return Err(e.into());
        }
    };
    logger::init(config.log_level);

    let records = input_loader::load_records(&config.sink_path);
    if records.is_empty() {
        info!("No jobs found in {:?}.", config.sink_path);
        return Ok(());
    }
    info!("Found {} jobs. Starting upload...", records.len());

    let employers = EmployerDirectory::load(&config.employers_file)?;
    let publisher = Publisher::new(
        RequestClient::from_defaults()?,
        config.jboard_url.as_str(),
        config.jboard_api_key.as_str(),
        config.category_id,
        employers,
    );

    let report = publisher.publish_all(&records);
    if report.failed > 0 {
        error!("{} jobs failed to publish", report.failed);
    }
    Ok(())
}
