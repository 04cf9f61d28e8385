//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crtsh_exporter::{ExporterError, Fetcher, RateLimiter, Transport};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Value};
use url::Url;

/// Answers searches from a fixed table keyed by the `q` parameter and
/// records when each request arrived.
#[derive(Default)]
pub struct ScriptedTransport {
    bodies: HashMap<String, Vec<u8>>,
    statuses: HashMap<String, u16>,
    requests: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedTransport {
    pub fn new() -> ScriptedTransport {
        ScriptedTransport::default()
    }

    pub fn respond(mut self, query: &str, body: &[u8]) -> ScriptedTransport {
        self.bodies.insert(query.to_string(), body.to_vec());
        self
    }

    pub fn respond_records(self, query: &str, records: &[Value]) -> ScriptedTransport {
        let body = serde_json::to_vec(records).unwrap();
        self.respond(query, &body)
    }

    pub fn fail(mut self, query: &str, status: u16) -> ScriptedTransport {
        self.statuses.insert(query.to_string(), status);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(q, _)| q.clone())
            .collect()
    }

    pub fn instants(&self) -> Vec<Instant> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &Url) -> Result<Vec<u8>, ExporterError> {
        let query = url
            .query_pairs()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        self.requests
            .lock()
            .unwrap()
            .push((query.clone(), Instant::now()));

        if let Some(status) = self.statuses.get(&query) {
            return Err(ExporterError::HttpStatus {
                url: url.to_string(),
                status: *status,
            });
        }
        match self.bodies.get(&query) {
            Some(body) => Ok(body.clone()),
            None => Err(ExporterError::Transport {
                url: url.to_string(),
                details: "no route".to_string(),
            }),
        }
    }
}

pub fn record(id: i64, common_name: &str, not_after: &str, serial_number: &str) -> Value {
    json!({
        "issuer_ca_id": 183267,
        "issuer_name": "C=US, O=Let's Encrypt, CN=R3",
        "common_name": common_name,
        "name_value": format!("{}\nalt.{}", common_name, common_name),
        "id": id,
        "entry_timestamp": "2024-01-01T00:00:05.123",
        "not_before": "2024-01-01T00:00:00",
        "not_after": not_after,
        "serial_number": serial_number,
    })
}

pub fn fetcher(transport: Arc<ScriptedTransport>) -> Fetcher {
    Fetcher::new(transport, Arc::new(RateLimiter::new(1000.0, 100).unwrap()))
}

pub fn render(families: &[MetricFamily]) -> String {
    let mut buf = Vec::new();
    TextEncoder::new().encode(families, &mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

/// Sample lines of the named metric.
pub fn samples<'a>(text: &'a str, name: &str) -> Vec<&'a str> {
    let prefix = format!("{}{{", name);
    text.lines()
        .filter(|line| line.starts_with(&prefix) || line.starts_with(&format!("{} ", name)))
        .collect()
}
