use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use log::{debug, error, info, warn};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;

use crate::delay_manager::{Sleeper, ThreadSleeper};
use crate::error::{Result, ScraperError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Put => "PUT",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ScraperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "patch" => Ok(HttpMethod::Patch),
            "put" => Ok(HttpMethod::Put),
            _ => {
                error!("Invalid method: {}. Valid methods: get, post, patch, put", s);
                Err(ScraperError::InvalidMethod(s.to_string()))
            }
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of a response status, for callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Throttled,
    ClientError,
    ServerError,
}

impl Severity {
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Severity::Throttled,
            500.. => Severity::ServerError,
            400..=499 => Severity::ClientError,
            _ => Severity::Success,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub json: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        HttpRequest {
            method,
            url: url.into(),
            params: Vec::new(),
            headers: Vec::new(),
            json: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.json = Some(body);
        self
    }

    /// Looks up a query parameter by name.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    /// Header names are stored lowercased.
    pub headers: HashMap<String, String>,
    pub body: String,
    pub severity: Severity,
}

impl HttpResponse {
    pub fn new(
        status_code: u16,
        headers: HashMap<String, String>,
        body: impl Into<String>,
    ) -> Self {
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        HttpResponse {
            status_code,
            headers,
            body: body.into(),
            severity: Severity::from_status(status_code),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Sends one HTTP request and reports what came back.
///
/// Implementations return `Err` only when no response was received at all
/// (connection refused, timeout, unreadable body).
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).send(request)
    }
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()?;
        Ok(ReqwestTransport { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Put => reqwest::Method::PUT,
        };

        let mut builder = self.client.request(method, &request.url);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.json {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .map_err(|e| ScraperError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp
            .text()
            .map_err(|e| ScraperError::Transport(e.to_string()))?;

        Ok(HttpResponse::new(status, headers, body))
    }
}

/// Retry bounds for throttled (429) responses.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Header carrying the server's requested wait in whole seconds.
    pub throttle_header: String,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(32),
            throttle_header: "X-QBAPI-Throttle-TTL".to_string(),
        }
    }
}

pub struct RequestClient<T = ReqwestTransport, S = ThreadSleeper> {
    transport: T,
    sleeper: S,
    policy: BackoffPolicy,
}

impl RequestClient<ReqwestTransport, ThreadSleeper> {
    pub fn from_defaults() -> Result<Self> {
        Ok(RequestClient::new(ReqwestTransport::new()?, ThreadSleeper))
    }
}

impl<T: Transport, S: Sleeper> RequestClient<T, S> {
    pub fn new(transport: T, sleeper: S) -> Self {
        RequestClient {
            transport,
            sleeper,
            policy: BackoffPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Issues `method` against `url` with query `params`.
    ///
    /// The method is validated before anything touches the network.
    pub fn request(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        let method: HttpMethod = method.parse()?;
        let mut request = HttpRequest::new(method, url);
        for (key, value) in params {
            request = request.query(*key, *value);
        }
        self.send(&request)
    }

    /// Sends `request`, backing off while the server answers 429.
    ///
    /// Once retries run out the last throttled response is returned as-is.
    pub fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut response = self.transport.send(request)?;
        let mut retries = 0;
        let mut backoff = self.policy.initial_backoff;

        while response.status_code == 429 && retries < self.policy.max_retries {
            let wait = self.throttle_hint(&response).unwrap_or(backoff);
            info!(
                "Attempt {}/{} - Received 429 from {}, retrying in {} seconds...",
                retries + 1,
                self.policy.max_retries,
                request.url,
                wait.as_secs()
            );
            self.sleeper.sleep(wait);
            backoff = (wait * 2).min(self.policy.max_backoff);
            retries += 1;
            response = self.transport.send(request)?;
        }

        log_outcome(request, &response);
        Ok(response)
    }

    fn throttle_hint(&self, response: &HttpResponse) -> Option<Duration> {
        let seconds: u64 = response
            .header(&self.policy.throttle_header)?
            .trim()
            .parse()
            .ok()?;
        Some(Duration::from_secs(seconds).min(self.policy.max_backoff))
    }
}

fn log_outcome(request: &HttpRequest, response: &HttpResponse) {
    match response.severity {
        Severity::Throttled => error!(
            "Max retries reached. {} {} failed with 429 Too Many Requests.",
            request.method, request.url
        ),
        Severity::ServerError => error!(
            "Server error: {} from {} {}.",
            response.status_code, request.method, request.url
        ),
        Severity::ClientError => warn!(
            "Client error: {} from {} {}.",
            response.status_code, request.method, request.url
        ),
        Severity::Success => debug!(
            "Request succeeded with status: {}.",
            response.status_code
        ),
    }
}
