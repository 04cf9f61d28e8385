//! Prometheus collectors.
//!
//! Each collector implements [`prometheus::core::Collector`]: `desc()` returns
//! the fixed descriptors built at construction, `collect()` queries crt.sh
//! synchronously and returns whatever could be gathered. Neither ever fails;
//! a broken or empty upstream answer shows up as missing samples.
//!
//! # Submodules
//!
//! - `hosts` - most recent certificate per configured host
//! - `domain` - every certificate under a base domain
//! - `exporter` - build information and start time
//! - `prom` - shared descriptor helpers

pub mod domain;
pub mod exporter;
pub mod hosts;
pub mod prom;

pub use domain::DomainCollector;
pub use exporter::{BuildInfo, ExporterCollector};
pub use hosts::HostsCollector;
