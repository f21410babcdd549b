use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::Local;
use log::{error, info, warn};
use serde::Serialize;

use crate::delay_manager::{Sleeper, ThreadSleeper};
use crate::error::Result;
use crate::extractor::NOT_AVAILABLE;
use crate::request_client::{HttpMethod, HttpRequest, RequestClient, ReqwestTransport, Transport};
use crate::search_engine::JobRecord;

/// Maps company names to job-board employer ids.
#[derive(Debug, Clone, Default)]
pub struct EmployerDirectory {
    ids: HashMap<String, u64>,
}

impl EmployerDirectory {
    /// Reads a `{"Company": id}` table. A missing file yields an empty directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Employer file {:?} not found, every job will be skipped", path);
            return Ok(Self::default());
        }
        let ids: HashMap<String, u64> = serde_json::from_str(&fs::read_to_string(path)?)?;
        info!("Loaded {} employers from {:?}", ids.len(), path);
        Ok(EmployerDirectory { ids })
    }

    pub fn get(&self, company: &str) -> Option<u64> {
        self.ids.get(company.trim()).copied()
    }
}

impl FromIterator<(String, u64)> for EmployerDirectory {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        EmployerDirectory { ids: iter.into_iter().collect() }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JobPosting {
    pub title: String,
    pub description: String,
    pub link: String,
    pub category_id: u64,
    pub employer_id: u64,
    pub posted_at: String,
    pub job_expires_in_days: u32,
    pub location: String,
    pub company: String,
    pub apply_by: &'static str,
    pub confirmation_status: &'static str,
    pub apply_to: String,
    pub featured: bool,
    pub remote: bool,
    pub pin_to_top: bool,
}

fn present(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty() && value != NOT_AVAILABLE).then_some(value)
}

impl JobPosting {
    /// Builds the payload for `record`, or `None` when title, description or link is missing.
    pub fn from_record(
        record: &JobRecord,
        employer_id: u64,
        category_id: u64,
        posted_at: &str,
    ) -> Option<Self> {
        let title = present(&record.title)?;
        let link = present(&record.link)?;
        let description = record
            .description
            .as_deref()
            .and_then(present)
            .or_else(|| present(&record.snippet))?;

        let location = present(&record.location);
        let remote = location.map_or(true, |l| l.to_lowercase().contains("remote"));

        Some(JobPosting {
            title: title.to_string(),
            description: description.to_string(),
            link: link.to_string(),
            category_id,
            employer_id,
            posted_at: posted_at.to_string(),
            job_expires_in_days: 30,
            location: location.unwrap_or("Remote").to_string(),
            company: record.company.clone(),
            apply_by: "by_link",
            confirmation_status: "confirmed",
            apply_to: link.to_string(),
            featured: false,
            remote,
            pin_to_top: false,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub posted: usize,
    pub skipped_unknown_employer: usize,
    pub skipped_incomplete: usize,
    pub failed: usize,
}

pub struct Publisher<T = ReqwestTransport, S = ThreadSleeper> {
    client: RequestClient<T, S>,
    url: String,
    api_key: String,
    category_id: u64,
    employers: EmployerDirectory,
}

impl<T: Transport, S: Sleeper> Publisher<T, S> {
    pub fn new(
        client: RequestClient<T, S>,
        url: impl Into<String>,
        api_key: impl Into<String>,
        category_id: u64,
        employers: EmployerDirectory,
    ) -> Self {
        Publisher {
            client,
            url: url.into(),
            api_key: api_key.into(),
            category_id,
            employers,
        }
    }

    /// Posts one payload. Returns whether the board answered 201.
    pub fn post(&self, posting: &JobPosting) -> bool {
        info!("Posting job: {} for {}", posting.title, posting.company);
        let body = match serde_json::to_value(posting) {
            Ok(body) => body,
            Err(e) => {
                error!("Could not encode job {}: {}", posting.title, e);
                return false;
            }
        };
        let request = HttpRequest::new(HttpMethod::Post, self.url.as_str())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body);

        match self.client.send(&request) {
            Ok(response) if response.status_code == 201 => {
                info!("SUCCESS: Posted job: {}", posting.title);
                true
            }
            Ok(response) => {
                error!(
                    "Job posting failed for {} (status {}): {}",
                    posting.title, response.status_code, response.body
                );
                false
            }
            Err(e) => {
                error!("Request failed for {}: {}", posting.title, e);
                false
            }
        }
    }

    pub fn publish_all(&self, records: &[JobRecord]) -> PublishReport {
        let posted_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut report = PublishReport::default();

        for record in records {
            let Some(employer_id) = self.employers.get(&record.company) else {
                warn!("Skipping job - Unknown employer: {}", record.company);
                report.skipped_unknown_employer += 1;
                continue;
            };
            let posting =
                JobPosting::from_record(record, employer_id, self.category_id, &posted_at);
            let Some(posting) = posting else {
                warn!("Skipping job with missing required fields: {}", record.title);
                report.skipped_incomplete += 1;
                continue;
            };

            if self.post(&posting) {
                report.posted += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            "Publishing finished: {} posted, {} unknown employers, {} incomplete, {} failed",
            report.posted, report.skipped_unknown_employer, report.skipped_incomplete, report.failed
        );
        report
    }
}
