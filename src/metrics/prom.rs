use std::collections::HashMap;

use log::{debug, info, warn};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};

use crate::ExporterError;

pub const NAMESPACE: &str = "crtsh";
pub const SUBSYSTEM: &str = "exporter";

/// A gauge family with a fixed label set.
///
/// The descriptor is built once; every scrape gets a fresh [`GaugeVec`] from
/// [`GaugeFamily::gauge_vec`] so concurrent scrapes never share samples.
#[derive(Debug)]
pub struct GaugeFamily {
    opts: Opts,
    labels: Vec<String>,
    desc: Desc,
}

impl GaugeFamily {
    pub fn new(name: &str, help: &str, labels: &[&str]) -> Result<GaugeFamily, ExporterError> {
        let opts = Opts::new(name, help)
            .namespace(NAMESPACE)
            .subsystem(SUBSYSTEM);
        let labels: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        debug!("name={} Creating Metric", opts.fq_name());

        let desc = Desc::new(
            opts.fq_name(),
            opts.help.clone(),
            labels.clone(),
            HashMap::new(),
        )?;
        Ok(GaugeFamily { opts, labels, desc })
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    pub fn fq_name(&self) -> &str {
        &self.desc.fq_name
    }

    pub fn label_names(&self) -> &[String] {
        &self.labels
    }

    pub fn gauge_vec(&self) -> Result<GaugeVec, ExporterError> {
        let labels: Vec<&str> = self.labels.iter().map(String::as_str).collect();
        Ok(GaugeVec::new(self.opts.clone(), &labels)?)
    }
}

/// Families of the given vectors that carry at least one sample.
pub fn families(vecs: &[&GaugeVec]) -> Vec<MetricFamily> {
    vecs.iter()
        .flat_map(|v| Collector::collect(*v))
        .filter(|mf| !mf.get_metric().is_empty())
        .collect()
}

/// Logs why `target` contributes nothing to this scrape.
pub(crate) fn report_skip(target: &str, err: &ExporterError) {
    if err.is_empty_result() {
        info!("target={} No records", target);
    } else {
        warn!("target={} kind={} Skipping: {}", target, err.kind(), err);
    }
}
