//! Scrape-time registry.
//!
//! The host-list and domain collectors publish the same metric names with
//! different label sets, which `prometheus::Registry` refuses to hold side by
//! side. This registry accepts any collector and merges same-named families
//! at gather time, so one exposition carries both.

use std::collections::btree_map::{BTreeMap, Entry};

use log::debug;
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};

use crate::ExporterError;

#[derive(Default)]
pub struct Registry {
    collectors: Vec<Box<dyn Collector>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Adds a collector.
    ///
    /// # Errors
    ///
    /// Returns `ExporterError::Metrics` if the collector describes no metrics.
    pub fn register(&mut self, collector: Box<dyn Collector>) -> Result<(), ExporterError> {
        let descs = collector.desc();
        if descs.is_empty() {
            return Err(ExporterError::Metrics {
                details: "collector has no descriptors".to_string(),
            });
        }
        for desc in &descs {
            debug!(
                "name={} labels={:?} Registering metric",
                desc.fq_name, desc.variable_labels
            );
        }
        self.collectors.push(collector);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Collects every registered collector, in registration order.
    ///
    /// Empty families are dropped; families sharing a name are merged into
    /// the first one seen. The result is sorted by name.
    pub fn gather(&self) -> Vec<MetricFamily> {
        let mut by_name: BTreeMap<String, MetricFamily> = BTreeMap::new();
        for collector in &self.collectors {
            for mut mf in collector.collect() {
                if mf.get_metric().is_empty() {
                    continue;
                }
                match by_name.entry(mf.name().to_string()) {
                    Entry::Vacant(entry) => {
                        entry.insert(mf);
                    }
                    Entry::Occupied(mut entry) => {
                        let merged = entry.get_mut().mut_metric();
                        for metric in mf.take_metric() {
                            merged.push(metric);
                        }
                    }
                }
            }
        }
        by_name.into_values().collect()
    }

    /// Gathers and renders the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, ExporterError> {
        let families = self.gather();
        let mut buf = Vec::new();
        TextEncoder::new().encode(&families, &mut buf)?;
        String::from_utf8(buf).map_err(|e| ExporterError::Metrics {
            details: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Desc;
    use prometheus::{Gauge, GaugeVec, Opts};

    struct Fixed {
        vec: GaugeVec,
    }

    impl Fixed {
        fn new(label: &str, value: &str) -> Fixed {
            let vec = GaugeVec::new(Opts::new("shared", "help"), &[label]).unwrap();
            vec.with_label_values(&[value]).set(1.0);
            Fixed { vec }
        }
    }

    impl Collector for Fixed {
        fn desc(&self) -> Vec<&Desc> {
            self.vec.desc()
        }

        fn collect(&self) -> Vec<MetricFamily> {
            self.vec.collect()
        }
    }

    struct Silent;

    impl Collector for Silent {
        fn desc(&self) -> Vec<&Desc> {
            Vec::new()
        }

        fn collect(&self) -> Vec<MetricFamily> {
            Vec::new()
        }
    }

    #[test]
    fn test_rejects_collector_without_descriptors() {
        let mut registry = Registry::new();
        assert!(registry.register(Box::new(Silent)).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_merges_families_with_same_name() {
        let mut registry = Registry::new();
        registry.register(Box::new(Fixed::new("domain", "example.com"))).unwrap();
        registry.register(Box::new(Fixed::new("name", "www.example.com"))).unwrap();
        assert_eq!(registry.len(), 2);

        let families = registry.gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_metric().len(), 2);

        let text = registry.render().unwrap();
        assert_eq!(text.matches("# TYPE shared gauge").count(), 1);
        assert!(text.contains(r#"shared{domain="example.com"} 1"#));
        assert!(text.contains(r#"shared{name="www.example.com"} 1"#));
    }

    #[test]
    fn test_sorted_by_name() {
        let mut registry = Registry::new();
        let b = Gauge::new("b_metric", "help").unwrap();
        let a = Gauge::new("a_metric", "help").unwrap();
        registry.register(Box::new(b)).unwrap();
        registry.register(Box::new(a)).unwrap();

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|mf| mf.name().to_string())
            .collect();
        assert_eq!(names, vec!["a_metric", "b_metric"]);
    }
}
