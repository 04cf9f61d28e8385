use std::collections::HashSet;

use log::{debug, error, info, warn};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;

use crate::domain::Domain;
use crate::fetch::Fetcher;
use crate::metrics::prom::{self, GaugeFamily};
use crate::ExporterError;

/// Collects every unexpired certificate issued under a domain.
///
/// A single search covers the whole domain. Each record's common name is
/// reduced to its host label; records that don't resolve are skipped.
///
/// Records sharing host, validity and serial number (a precertificate and
/// its certificate when upstream deduplication is off) map to the same
/// expiry series and yield one sample. The records count still includes
/// both.
pub struct DomainCollector {
    fetcher: Fetcher,
    domain: Domain,

    certificate_records: GaugeFamily,
    certificate_expiry: GaugeFamily,
}

impl DomainCollector {
    /// # Errors
    ///
    /// Returns `ExporterError::Configuration` if `domain` is empty.
    pub fn new(domain: &str, fetcher: Fetcher) -> Result<DomainCollector, ExporterError> {
        Ok(DomainCollector {
            fetcher,
            domain: Domain::new(domain)?,
            certificate_records: GaugeFamily::new(
                "certificate_records",
                "Number of Certificate records, labeled by most recent record's metadata",
                &["domain"],
            )?,
            certificate_expiry: GaugeFamily::new(
                "certificate_expiry",
                "Expiration (\"not after\") timestamp of most recent record",
                &["domain", "host", "not_before", "not_after", "serial_number"],
            )?,
        })
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    fn try_collect(&self) -> Result<Vec<MetricFamily>, ExporterError> {
        let certificate_records = self.certificate_records.gauge_vec()?;
        let certificate_expiry = self.certificate_expiry.gauge_vec()?;
        let domain = self.domain.name();

        let records = match self.fetcher.search(domain) {
            Ok(records) => records,
            Err(e) => {
                prom::report_skip(domain, &e);
                return Ok(Vec::new());
            }
        };
        info!("domain={} number={} Records", domain, records.len());

        certificate_records
            .get_metric_with_label_values(&[domain])?
            .set(records.len() as f64);

        let mut seen = HashSet::new();
        for record in &records {
            debug!("domain={} record={:?} Record", domain, record);

            let host = match self.domain.hostname(&record.common_name) {
                Ok(host) => host,
                Err(e) => {
                    warn!(
                        "domain={} id={} kind={} Unable to get host name: {}",
                        domain,
                        record.id,
                        e.kind(),
                        e
                    );
                    continue;
                }
            };

            let not_before = record.not_before.label();
            let not_after = record.not_after.label();
            let series = (
                host,
                not_before.clone(),
                not_after.clone(),
                record.serial_number.as_str(),
            );
            if !seen.insert(series) {
                debug!(
                    "domain={} id={} host={} serial_number={} Duplicate expiry series",
                    domain, record.id, host, record.serial_number
                );
            }
            certificate_expiry
                .get_metric_with_label_values(&[
                    domain,
                    host,
                    not_before.as_str(),
                    not_after.as_str(),
                    record.serial_number.as_str(),
                ])?
                .set(record.not_after.unix() as f64);
        }

        Ok(prom::families(&[&certificate_records, &certificate_expiry]))
    }
}

impl Collector for DomainCollector {
    fn desc(&self) -> Vec<&Desc> {
        vec![
            self.certificate_records.desc(),
            self.certificate_expiry.desc(),
        ]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.try_collect().unwrap_or_else(|e| {
            error!(
                "collector=domain domain={} Unable to collect: {}",
                self.domain.name(),
                e
            );
            Vec::new()
        })
    }
}
