use chrono::Utc;
use lazy_static::lazy_static;
use log::error;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;

use crate::metrics::prom::{self, GaugeFamily};
use crate::ExporterError;

lazy_static! {
    /// Process start time as a Unix epoch
    pub static ref START_TIME: i64 = Utc::now().timestamp();
}

/// Build metadata, expected to be set through the environment at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub os_version: String,
    pub rust_version: String,
    pub git_commit: String,
}

impl BuildInfo {
    pub fn from_env() -> BuildInfo {
        BuildInfo {
            os_version: option_env!("OS_VERSION").unwrap_or_default().to_string(),
            rust_version: option_env!("RUSTC_VERSION").unwrap_or_default().to_string(),
            git_commit: option_env!("GIT_COMMIT").unwrap_or_default().to_string(),
        }
    }

    /// Names of the fields left unset at build time.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("OS_VERSION", &self.os_version),
            ("RUSTC_VERSION", &self.rust_version),
            ("GIT_COMMIT", &self.git_commit),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Describes the exporter itself.
pub struct ExporterCollector {
    info: BuildInfo,
    start_time: i64,

    build_info: GaugeFamily,
    start_time_seconds: GaugeFamily,
}

impl ExporterCollector {
    pub fn new(info: BuildInfo) -> Result<ExporterCollector, ExporterError> {
        Ok(ExporterCollector {
            info,
            start_time: *START_TIME,
            build_info: GaugeFamily::new(
                "build_info",
                "A metric with a constant '1' value labeled by OS version, Rust version, and Git commit of the exporter",
                &["os_version", "rust_version", "git_commit"],
            )?,
            start_time_seconds: GaugeFamily::new(
                "start_time",
                "Exporter start time in Unix epoch seconds",
                &[],
            )?,
        })
    }

    fn try_collect(&self) -> Result<Vec<MetricFamily>, ExporterError> {
        let build_info = self.build_info.gauge_vec()?;
        let start_time = self.start_time_seconds.gauge_vec()?;

        build_info
            .get_metric_with_label_values(&[
                self.info.os_version.as_str(),
                self.info.rust_version.as_str(),
                self.info.git_commit.as_str(),
            ])?
            .set(1.0);
        let no_labels: [&str; 0] = [];
        start_time
            .get_metric_with_label_values(&no_labels)?
            .set(self.start_time as f64);

        Ok(prom::families(&[&build_info, &start_time]))
    }
}

impl Collector for ExporterCollector {
    fn desc(&self) -> Vec<&Desc> {
        vec![self.build_info.desc(), self.start_time_seconds.desc()]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.try_collect().unwrap_or_else(|e| {
            error!("collector=exporter Unable to collect: {}", e);
            Vec::new()
        })
    }
}
