//! Rate-limited crt.sh search.
//!
//! [`Fetcher::search`] is the only way collectors talk to upstream. It builds
//! the query URL, waits for a token from the shared [`RateLimiter`], performs
//! the request through a [`Transport`] and decodes the records.

use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use log::debug;
use url::Url;

use crate::ratelimit::RateLimiter;
use crate::record::Record;
use crate::ExporterError;

/// crt.sh search endpoint.
pub const BASE_URL: &str = "https://crt.sh";
/// Default upstream request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

static USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// HTTP GET capability used by the fetcher.
///
/// Implementations return the raw response body of a successful (2xx)
/// response and map failures to `Transport`, `HttpStatus` or `BodyRead`.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url) -> Result<Vec<u8>, ExporterError>;
}

/// [`Transport`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Builds a client with the given request timeout.
    ///
    /// Must be called outside of an async runtime.
    pub fn new(timeout: Duration) -> Result<HttpTransport, ExporterError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ExporterError::configuration("timeout", &e.to_string()))?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &Url) -> Result<Vec<u8>, ExporterError> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| ExporterError::Transport {
                url: url.to_string(),
                details: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExporterError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().map_err(|e| ExporterError::BodyRead {
            details: e.to_string(),
        })?;
        Ok(body.to_vec())
    }
}

/// Query parameters asking crt.sh to pre-filter results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Adds `exclude=expired`
    pub exclude_expired: bool,
    /// Adds `deduplicate=Y`
    pub deduplicate: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            exclude_expired: true,
            deduplicate: true,
        }
    }
}

/// Searches crt.sh through a shared rate limiter.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    base_url: Url,
    options: SearchOptions,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, limiter: Arc<RateLimiter>) -> Fetcher {
        Fetcher {
            transport,
            limiter,
            base_url: DEFAULT_BASE_URL.clone(),
            options: SearchOptions::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: Url) -> Fetcher {
        self.base_url = base_url;
        self
    }

    pub fn with_options(mut self, options: SearchOptions) -> Fetcher {
        self.options = options;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds the search URL for `query`.
    pub fn search_url(&self, query: &str) -> Result<Url, ExporterError> {
        if query.trim().is_empty() {
            return Err(ExporterError::RequestBuild {
                reason: "search term is empty".to_string(),
            });
        }
        if self.base_url.cannot_be_a_base() {
            return Err(ExporterError::RequestBuild {
                reason: format!("'{}' cannot carry a query string", self.base_url),
            });
        }

        let mut url = self.base_url.clone();
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("q", query);
            q.append_pair("output", "json");
            if self.options.exclude_expired {
                q.append_pair("exclude", "expired");
            }
            if self.options.deduplicate {
                q.append_pair("deduplicate", "Y");
            }
        }
        Ok(url)
    }

    /// Returns the records matching `query`, most recent first.
    ///
    /// # Errors
    ///
    /// Any stage may fail (`RequestBuild`, `Transport`, `HttpStatus`,
    /// `BodyRead`, `Decode`); an empty answer is `EmptyResult`.
    pub fn search(&self, query: &str) -> Result<Vec<Record>, ExporterError> {
        let url = self.search_url(query)?;

        let waited = self.limiter.acquire();
        debug!(
            "query={} waited_ms={} Executing HTTP request",
            query,
            waited.as_millis()
        );
        let body = self.transport.get(&url)?;

        debug!("query={} bytes={} Decoding response", query, body.len());
        let records = Record::decode_all(&body)?;
        if records.is_empty() {
            return Err(ExporterError::EmptyResult {
                query: query.to_string(),
            });
        }
        Ok(records)
    }
}

lazy_static! {
    static ref DEFAULT_BASE_URL: Url = Url::parse(BASE_URL).unwrap();
}
