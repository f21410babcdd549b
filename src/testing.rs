//! Scripted fakes shared by the unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use serde_json::json;

use crate::delay_manager::Sleeper;
use crate::error::{Result, ScraperError};
use crate::request_client::{HttpRequest, HttpResponse, Transport};

/// Replays queued responses in order and records every request it sees.
///
/// Once the queue is drained it answers 200 with an empty search page.
#[derive(Default)]
pub struct FakeTransport {
    responses: RefCell<VecDeque<Result<HttpResponse>>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: HttpResponse) {
        self.responses.borrow_mut().push_back(Ok(response));
    }

    pub fn push_status(&self, status: u16) {
        self.push(HttpResponse::new(status, HashMap::new(), ""));
    }

    pub fn push_error(&self, message: &str) {
        self.responses
            .borrow_mut()
            .push_back(Err(ScraperError::Transport(message.to_string())));
    }

    /// Queues a search page whose items are `(title, link, snippet)`.
    pub fn push_page(&self, items: &[(&str, &str, &str)]) {
        self.push(search_page(items));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Transport for FakeTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(search_page(&[])))
    }
}

pub fn search_page(items: &[(&str, &str, &str)]) -> HttpResponse {
    let items: Vec<_> = items
        .iter()
        .map(|(title, link, snippet)| json!({ "title": title, "link": link, "snippet": snippet }))
        .collect();
    HttpResponse::new(200, HashMap::new(), json!({ "items": items }).to_string())
}

#[derive(Default)]
pub struct RecordingSleeper {
    waits: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.borrow_mut().push(duration);
    }
}
