//! Prometheus exporter for [crt.sh](https://crt.sh) certificate search.
//!
//! On every scrape the registered collectors query crt.sh, turn the returned
//! certificate transparency records into gauges and hand them to the
//! registry. Nothing is cached between scrapes.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use crtsh_exporter::{DomainCollector, Fetcher, HttpTransport, RateLimiter, Registry};
//!
//! let transport = Arc::new(HttpTransport::new(Duration::from_secs(30))?);
//! let limiter = Arc::new(RateLimiter::default());
//! let fetcher = Fetcher::new(transport, limiter);
//!
//! let mut registry = Registry::new();
//! registry.register(Box::new(DomainCollector::new("example.com", fetcher)?))?;
//! println!("{}", registry.render()?);
//! # Ok::<(), crtsh_exporter::ExporterError>(())
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod logger;
pub mod metrics;
pub mod ratelimit;
pub mod record;
pub mod registry;
pub mod server;

pub use domain::Domain;
pub use error::ExporterError;
pub use fetch::{Fetcher, HttpTransport, SearchOptions, Transport};
pub use metrics::{BuildInfo, DomainCollector, ExporterCollector, HostsCollector};
pub use ratelimit::RateLimiter;
pub use record::{Record, Timestamp};
pub use registry::Registry;
