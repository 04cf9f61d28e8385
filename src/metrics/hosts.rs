use log::{debug, error, info};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::GaugeVec;

use crate::fetch::Fetcher;
use crate::metrics::prom::{self, GaugeFamily};
use crate::ExporterError;

/// Collects the most recent certificate of each configured host.
///
/// Every scrape issues one search per host, in order. A host whose search
/// fails or returns nothing is skipped.
pub struct HostsCollector {
    fetcher: Fetcher,
    hosts: Vec<String>,

    certificate_records: GaugeFamily,
    certificate_expiry: GaugeFamily,
}

impl HostsCollector {
    pub fn new(hosts: Vec<String>, fetcher: Fetcher) -> Result<HostsCollector, ExporterError> {
        Ok(HostsCollector {
            fetcher,
            hosts,
            certificate_records: GaugeFamily::new(
                "certificate_records",
                "Number of Certificate records, labeled by most recent record's metadata",
                &["name", "not_before", "not_after", "serial_number"],
            )?,
            certificate_expiry: GaugeFamily::new(
                "certificate_expiry",
                "Expiration (\"not after\") timestamp of most recent record",
                &["name", "serial_number"],
            )?,
        })
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    fn collect_host(
        &self,
        host: &str,
        certificate_records: &GaugeVec,
        certificate_expiry: &GaugeVec,
    ) -> Result<(), ExporterError> {
        let records = self.fetcher.search(host)?;
        info!("host={} number={} Records", host, records.len());

        // upstream returns the most recent entry first
        let Some(record) = records.first() else {
            return Err(ExporterError::EmptyResult {
                query: host.to_string(),
            });
        };
        debug!("host={} record={:?} Most recent record", host, record);

        let name = record.primary_name();
        let not_before = record.not_before.label();
        let not_after = record.not_after.label();
        certificate_records
            .get_metric_with_label_values(&[
                name,
                not_before.as_str(),
                not_after.as_str(),
                record.serial_number.as_str(),
            ])?
            .set(records.len() as f64);
        certificate_expiry
            .get_metric_with_label_values(&[name, record.serial_number.as_str()])?
            .set(record.not_after.unix() as f64);
        Ok(())
    }

    fn try_collect(&self) -> Result<Vec<MetricFamily>, ExporterError> {
        let certificate_records = self.certificate_records.gauge_vec()?;
        let certificate_expiry = self.certificate_expiry.gauge_vec()?;

        for host in &self.hosts {
            if let Err(e) = self.collect_host(host, &certificate_records, &certificate_expiry) {
                prom::report_skip(host, &e);
            }
        }
        Ok(prom::families(&[&certificate_records, &certificate_expiry]))
    }
}

impl Collector for HostsCollector {
    fn desc(&self) -> Vec<&Desc> {
        vec![
            self.certificate_records.desc(),
            self.certificate_expiry.desc(),
        ]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.try_collect().unwrap_or_else(|e| {
            error!("collector=hosts Unable to collect: {}", e);
            Vec::new()
        })
    }
}
