//! Error types for certificate search collection.
//!
//! Every failure the collectors can hit while talking to crt.sh, decoding its
//! response or resolving host names is one variant of [`ExporterError`].
//! Collectors never propagate these out of a scrape; they log the error kind
//! together with the target and move on to the next target.

use std::fmt;

use strum::IntoStaticStr;

/// Error type for fetch, decode and resolve failures.
///
/// The variant name doubles as the `kind` field in log lines:
///
/// ```
/// # use crtsh_exporter::ExporterError;
/// let err = ExporterError::EmptyResult { query: "example.com".to_string() };
/// let kind: &'static str = (&err).into();
/// assert_eq!(kind, "EmptyResult");
/// ```
#[derive(Debug, IntoStaticStr)]
pub enum ExporterError {
    /// The upstream request could not be built
    RequestBuild {
        /// Why the request could not be built
        reason: String,
    },

    /// Network, DNS or TLS failure while executing the request
    Transport {
        /// The URL that was requested
        url: String,
        /// Details reported by the HTTP client
        details: String,
    },

    /// Upstream answered with a non-2xx status
    HttpStatus {
        /// The URL that was requested
        url: String,
        /// The HTTP status code
        status: u16,
    },

    /// The response body could not be read
    BodyRead {
        /// Details reported by the HTTP client
        details: String,
    },

    /// The response body is not a JSON array of records
    Decode {
        /// The underlying JSON error
        source: serde_json::Error,
    },

    /// Upstream returned an empty array
    EmptyResult {
        /// The search term that produced no records
        query: String,
    },

    /// An empty name was given to the domain resolver
    EmptyInput,

    /// The name cannot contain `{host}.{domain}`
    TooShort {
        /// The fully-qualified name
        fq_name: String,
        /// The base domain
        domain: String,
    },

    /// The name does not end with `.{domain}`
    SuffixMismatch {
        /// The fully-qualified name
        fq_name: String,
        /// The base domain
        domain: String,
    },

    /// Invalid collector or limiter construction input
    Configuration {
        /// Which field/parameter was invalid
        field: String,
        /// Why it was invalid
        reason: String,
    },

    /// The prometheus client rejected a descriptor or metric
    Metrics {
        /// The underlying prometheus error
        details: String,
    },
}

impl ExporterError {
    /// Short, stable name of the variant, used as log context.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// Whether this error only means "nothing to report" for a target.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyResult { .. })
    }

    pub(crate) fn configuration(field: &str, reason: &str) -> Self {
        Self::Configuration {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ExporterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestBuild { reason } => {
                write!(f, "unable to create request: {}", reason)
            }
            Self::Transport { url, details } => {
                write!(f, "unable to execute request to {}: {}", url, details)
            }
            Self::HttpStatus { url, status } => {
                write!(f, "request to {} returned status {}", url, status)
            }
            Self::BodyRead { details } => {
                write!(f, "unable to read response body: {}", details)
            }
            Self::Decode { source } => {
                write!(f, "unable to unmarshal response: {}", source)
            }
            Self::EmptyResult { query } => {
                write!(f, "expected at least one record in response for '{}'", query)
            }
            Self::EmptyInput => write!(f, "fqName is empty"),
            Self::TooShort { fq_name, domain } => {
                write!(
                    f,
                    "'{}' is too short; expected '{{host}}.{}'",
                    fq_name, domain
                )
            }
            Self::SuffixMismatch { fq_name, domain } => {
                write!(f, "'{}' does not end with '.{}'", fq_name, domain)
            }
            Self::Configuration { field, reason } => {
                write!(f, "Invalid configuration for '{}': {}", field, reason)
            }
            Self::Metrics { details } => {
                write!(f, "Prometheus error: {}", details)
            }
        }
    }
}

impl std::error::Error for ExporterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode { source } => Some(source),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ExporterError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode { source: e }
    }
}

impl From<prometheus::Error> for ExporterError {
    fn from(e: prometheus::Error) -> Self {
        Self::Metrics {
            details: e.to_string(),
        }
    }
}
