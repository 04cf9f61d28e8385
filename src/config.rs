//! Configuration file and command-line management.
//!
//! Settings can be given in a TOML file and on the command line. Values are
//! merged with clear precedence and then resolved into validated
//! [`Settings`].
//!
//! # Configuration Precedence
//!
//! 1. Default values (lowest priority)
//! 2. Configuration file (crtsh-exporter.toml or specified with --config)
//! 3. Command-line arguments (highest priority)
//!
//! # Example Configuration File
//!
//! ```toml
//! endpoint = ":8080"
//! path = "/metrics"
//! domain = "example.com"
//! hosts = ["www.example.com", "api.example.com"]
//!
//! [upstream]
//! base_url = "https://crt.sh"
//! rate_per_second = 1.0
//! burst = 4
//! timeout_secs = 30
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetch::{SearchOptions, BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::logger::LogFormat;
use crate::ratelimit::{DEFAULT_BURST, DEFAULT_RATE_PER_SECOND};

/// Configuration file looked up in the working directory when `--config`
/// is not given.
pub const DEFAULT_CONFIG_FILE: &str = "crtsh-exporter.toml";

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "crtsh-exporter", version, about, long_about = None)]
pub struct Cli {
    /// The endpoint of the Exporter HTTP server
    #[arg(long)]
    pub endpoint: Option<String>,

    /// The domain name to be queried
    #[arg(long)]
    pub domain: Option<String>,

    /// Comma-separated list of hosts to be queried
    #[arg(long, value_delimiter = ',')]
    pub hosts: Option<Vec<String>>,

    /// The path on which Prometheus metrics will be served
    #[arg(long)]
    pub path: Option<String>,

    /// Configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the certificate search service
    #[arg(long)]
    pub base_url: Option<String>,

    /// Upstream requests per second, shared by all collectors
    #[arg(long)]
    pub rate: Option<f64>,

    /// Upstream request burst capacity
    #[arg(long)]
    pub burst: Option<u32>,

    /// Upstream request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Include expired certificates in search results
    #[arg(long)]
    pub include_expired: bool,

    /// Do not ask upstream to deduplicate results
    #[arg(long)]
    pub no_deduplicate: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log line format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Print an example configuration file and exit
    #[arg(long)]
    pub generate_config: bool,
}

impl Cli {
    /// Converts the arguments into a [`Config`] holding only the values that
    /// were given.
    pub fn to_config(&self) -> Config {
        Config {
            endpoint: self.endpoint.clone(),
            path: self.path.clone(),
            domain: self.domain.clone(),
            hosts: self.hosts.clone(),
            log_level: self.log_level.clone(),
            log_format: self.log_format,
            upstream: Some(UpstreamConfig {
                base_url: self.base_url.clone(),
                rate_per_second: self.rate,
                burst: self.burst,
                timeout_secs: self.timeout,
                exclude_expired: self.include_expired.then_some(false),
                deduplicate: self.no_deduplicate.then_some(false),
            }),
        }
    }
}

/// Main configuration structure.
///
/// All fields are optional to support partial configuration and merging.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Listen address of the HTTP server (`host:port` or `:port`)
    pub endpoint: Option<String>,
    /// Metrics path
    pub path: Option<String>,
    /// Domain to search broadly
    pub domain: Option<String>,
    /// Exact hosts to search
    pub hosts: Option<Vec<String>>,
    /// Log level
    pub log_level: Option<String>,
    /// Log format: plain, json
    pub log_format: Option<LogFormat>,
    /// Upstream search configuration
    pub upstream: Option<UpstreamConfig>,
}

/// Upstream search and rate limiting configuration.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct UpstreamConfig {
    /// Base URL of the search service
    pub base_url: Option<String>,
    /// Requests per second shared by every collector
    pub rate_per_second: Option<f64>,
    /// Burst capacity of the rate limiter
    pub burst: Option<u32>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Ask upstream to exclude expired certificates
    pub exclude_expired: Option<bool>,
    /// Ask upstream to deduplicate precertificates
    pub deduplicate: Option<bool>,
}

/// Fully resolved and validated settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub endpoint: String,
    pub path: String,
    pub domain: Option<String>,
    pub hosts: Vec<String>,
    /// Explicit log level; `None` leaves `RUST_LOG` in charge
    pub log_level: Option<LevelFilter>,
    pub log_format: LogFormat,
    pub base_url: Url,
    pub rate_per_second: f64,
    pub burst: u32,
    pub timeout: Duration,
    pub search: SearchOptions,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully parsed configuration
    /// * `Err(ConfigError::Io)` - File could not be read
    /// * `Err(ConfigError::Parse)` - File contains invalid TOML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(config)
    }

    /// Configuration with every default filled in.
    ///
    /// # Default Values
    ///
    /// - `endpoint`: ":8080"
    /// - `path`: "/metrics"
    /// - `domain`, `hosts`: None
    /// - `log_level`: None (`RUST_LOG`, else info), `log_format`: plain
    /// - `upstream`: crt.sh, 1 request/s, burst 4, 30s timeout,
    ///   expired certificates excluded, deduplicated
    pub fn defaults() -> Self {
        Config {
            endpoint: Some(":8080".to_string()),
            path: Some("/metrics".to_string()),
            domain: None,
            hosts: None,
            log_level: None,
            log_format: Some(LogFormat::Plain),
            upstream: Some(UpstreamConfig {
                base_url: Some(BASE_URL.to_string()),
                rate_per_second: Some(DEFAULT_RATE_PER_SECOND),
                burst: Some(DEFAULT_BURST),
                timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
                exclude_expired: Some(true),
                deduplicate: Some(true),
            }),
        }
    }

    /// Merges this configuration with another, prioritizing the other's values.
    ///
    /// For each field, a `Some` in `other` overrides this config's value; a
    /// `None` keeps the current value.
    pub fn merge_with(mut self, other: Config) -> Self {
        if other.endpoint.is_some() {
            self.endpoint = other.endpoint;
        }
        if other.path.is_some() {
            self.path = other.path;
        }
        if other.domain.is_some() {
            self.domain = other.domain;
        }
        if other.hosts.is_some() {
            self.hosts = other.hosts;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if other.log_format.is_some() {
            self.log_format = other.log_format;
        }
        if let Some(other_up) = other.upstream {
            if let Some(ref mut self_up) = self.upstream {
                if other_up.base_url.is_some() {
                    self_up.base_url = other_up.base_url;
                }
                if other_up.rate_per_second.is_some() {
                    self_up.rate_per_second = other_up.rate_per_second;
                }
                if other_up.burst.is_some() {
                    self_up.burst = other_up.burst;
                }
                if other_up.timeout_secs.is_some() {
                    self_up.timeout_secs = other_up.timeout_secs;
                }
                if other_up.exclude_expired.is_some() {
                    self_up.exclude_expired = other_up.exclude_expired;
                }
                if other_up.deduplicate.is_some() {
                    self_up.deduplicate = other_up.deduplicate;
                }
            } else {
                self.upstream = Some(other_up);
            }
        }
        self
    }

    /// Validates the merged configuration.
    ///
    /// Missing values fall back to [`Config::defaults`]. Empty host entries
    /// are dropped and an empty domain counts as unset.
    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let config = Config::defaults().merge_with(self);
        let upstream = config.upstream.unwrap_or_default();

        let endpoint = normalize_endpoint(&config.endpoint.unwrap_or_default())?;

        let path = config.path.unwrap_or_default();
        if !path.starts_with('/') || path == "/" || path == "/healthz" {
            return Err(ConfigError::Validation(format!(
                "path '{}' must start with '/' and not collide with '/' or '/healthz'",
                path
            )));
        }

        let domain = config
            .domain
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        let hosts: Vec<String> = config
            .hosts
            .unwrap_or_default()
            .into_iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();

        let log_level = config
            .log_level
            .map(|level| {
                LevelFilter::from_str(&level)
                    .map_err(|_| ConfigError::Validation(format!("unknown log level '{}'", level)))
            })
            .transpose()?;

        let base_url = upstream.base_url.unwrap_or_default();
        let base_url = Url::parse(&base_url)
            .map_err(|e| ConfigError::Validation(format!("base_url '{}': {}", base_url, e)))?;

        let rate_per_second = upstream.rate_per_second.unwrap_or(DEFAULT_RATE_PER_SECOND);
        if !rate_per_second.is_finite() || rate_per_second <= 0.0 {
            return Err(ConfigError::Validation(
                "rate_per_second must be greater than zero".to_string(),
            ));
        }
        let burst = upstream.burst.unwrap_or(DEFAULT_BURST);
        if burst == 0 {
            return Err(ConfigError::Validation("burst must be at least 1".to_string()));
        }
        let timeout_secs = upstream.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Settings {
            endpoint,
            path,
            domain,
            hosts,
            log_level,
            log_format: config.log_format.unwrap_or_default(),
            base_url,
            rate_per_second,
            burst,
            timeout: Duration::from_secs(timeout_secs),
            search: SearchOptions {
                exclude_expired: upstream.exclude_expired.unwrap_or(true),
                deduplicate: upstream.deduplicate.unwrap_or(true),
            },
        })
    }

    /// Loads the file named by `--config`, or the default file if present.
    pub fn load(path: Option<&Path>) -> Result<Option<Self>, ConfigError> {
        match path {
            Some(path) => Config::from_file(path).map(Some),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Config::from_file(DEFAULT_CONFIG_FILE).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Generates an example configuration file in TOML format.
    pub fn example_toml() -> String {
        let example = Config {
            domain: Some("example.com".to_string()),
            hosts: Some(vec![
                "www.example.com".to_string(),
                "api.example.com".to_string(),
            ]),
            ..Config::defaults()
        };

        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| "# Error generating example".to_string())
    }
}

/// Accepts `:port` as shorthand for all interfaces.
fn normalize_endpoint(endpoint: &str) -> Result<String, ConfigError> {
    let endpoint = match endpoint.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => endpoint.to_string(),
    };
    match endpoint.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(endpoint),
        _ => Err(ConfigError::Validation(format!(
            "endpoint '{}' must be host:port or :port",
            endpoint
        ))),
    }
}

/// Errors that can occur during configuration loading and parsing.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error (file not found, permission denied, etc.)
    Io(String),
    /// TOML parsing error (invalid syntax, type mismatch, etc.)
    Parse(String),
    /// Validation error (invalid values)
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "IO Error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse Error: {}", msg),
            ConfigError::Validation(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_from_toml() {
        let toml_content = r#"
            endpoint = "127.0.0.1:9090"
            domain = "example.com"
            hosts = ["www.example.com", "api.example.com"]
            log_format = "json"

            [upstream]
            rate_per_second = 2.5
            burst = 8
            exclude_expired = false
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.endpoint, Some("127.0.0.1:9090".to_string()));
        assert_eq!(config.domain, Some("example.com".to_string()));
        assert_eq!(
            config.hosts,
            Some(vec![
                "www.example.com".to_string(),
                "api.example.com".to_string()
            ])
        );
        assert_eq!(config.log_format, Some(LogFormat::Json));
        assert_eq!(config.path, None);

        let upstream = config.upstream.unwrap();
        assert_eq!(upstream.rate_per_second, Some(2.5));
        assert_eq!(upstream.burst, Some(8));
        assert_eq!(upstream.exclude_expired, Some(false));
        assert_eq!(upstream.deduplicate, None);
    }

    #[test]
    fn test_config_merge() {
        let base_config = Config {
            domain: Some("base.com".to_string()),
            path: Some("/metrics".to_string()),
            upstream: Some(UpstreamConfig {
                rate_per_second: Some(1.0),
                burst: Some(4),
                ..UpstreamConfig::default()
            }),
            ..Config::default()
        };

        let override_config = Config {
            domain: Some("override.com".to_string()),
            upstream: Some(UpstreamConfig {
                burst: Some(10),
                ..UpstreamConfig::default()
            }),
            ..Config::default()
        };

        let merged = base_config.merge_with(override_config);

        assert_eq!(merged.domain, Some("override.com".to_string()));
        assert_eq!(merged.path, Some("/metrics".to_string())); // From base (not overridden)

        let upstream = merged.upstream.unwrap();
        assert_eq!(upstream.rate_per_second, Some(1.0)); // From base
        assert_eq!(upstream.burst, Some(10)); // Overridden
    }

    #[test]
    fn test_config_defaults_resolve() {
        let settings = Config::default().resolve().unwrap();

        assert_eq!(settings.endpoint, "0.0.0.0:8080");
        assert_eq!(settings.path, "/metrics");
        assert_eq!(settings.domain, None);
        assert!(settings.hosts.is_empty());
        assert_eq!(settings.log_level, None);
        assert_eq!(settings.log_format, LogFormat::Plain);
        assert_eq!(settings.base_url.as_str(), "https://crt.sh/");
        assert_eq!(settings.rate_per_second, 1.0);
        assert_eq!(settings.burst, 4);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.search, SearchOptions::default());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = Config {
            domain: Some("file.com".to_string()),
            hosts: Some(vec!["a.file.com".to_string()]),
            ..Config::default()
        };
        let cli = Cli::try_parse_from([
            "crtsh-exporter",
            "--hosts",
            "www.cli.com, ,api.cli.com",
            "--rate",
            "0.5",
            "--include-expired",
            "--endpoint",
            "127.0.0.1:9100",
        ])
        .unwrap();

        let settings = Config::default()
            .merge_with(file)
            .merge_with(cli.to_config())
            .resolve()
            .unwrap();

        assert_eq!(settings.domain, Some("file.com".to_string()));
        assert_eq!(settings.hosts, vec!["www.cli.com", "api.cli.com"]);
        assert_eq!(settings.rate_per_second, 0.5);
        assert_eq!(settings.endpoint, "127.0.0.1:9100");
        assert!(!settings.search.exclude_expired);
        assert!(settings.search.deduplicate);
    }

    #[test]
    fn test_log_level_only_when_given() {
        let file = Config {
            log_level: Some("debug".to_string()),
            ..Config::default()
        };
        let settings = Config::defaults().merge_with(file).resolve().unwrap();
        assert_eq!(settings.log_level, Some(LevelFilter::Debug));

        let cli = Cli::try_parse_from(["crtsh-exporter", "--log-level", "warn"]).unwrap();
        let settings = cli.to_config().resolve().unwrap();
        assert_eq!(settings.log_level, Some(LevelFilter::Warn));

        assert_eq!(Config::defaults().log_level, None);
        assert!(!Config::example_toml().contains("log_level"));
    }

    #[test]
    fn test_empty_domain_is_unset() {
        let config = Config {
            domain: Some("  ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolve().unwrap().domain, None);
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            Config {
                path: Some("metrics".to_string()),
                ..Config::default()
            },
            Config {
                endpoint: Some("localhost".to_string()),
                ..Config::default()
            },
            Config {
                log_level: Some("loud".to_string()),
                ..Config::default()
            },
            Config {
                upstream: Some(UpstreamConfig {
                    rate_per_second: Some(0.0),
                    ..UpstreamConfig::default()
                }),
                ..Config::default()
            },
            Config {
                upstream: Some(UpstreamConfig {
                    base_url: Some("not a url".to_string()),
                    ..UpstreamConfig::default()
                }),
                ..Config::default()
            },
        ];

        for config in cases {
            match config.clone().resolve() {
                Err(ConfigError::Validation(_)) => {}
                other => panic!("Expected ValidationError for {:?}, got {:?}", config, other),
            }
        }
    }

    #[test]
    fn test_invalid_toml() {
        let invalid_toml = "hosts = [invalid toml";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        let result = Config::from_file(temp_file.path());
        assert!(result.is_err());

        match result.unwrap_err() {
            ConfigError::Parse(_) => {} // Expected
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_config_file() {
        let result = Config::load(Some(Path::new("/nonexistent/crtsh-exporter.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_example_toml_generation() {
        let example = Config::example_toml();

        let parsed: Config = toml::from_str(&example).unwrap();

        assert_eq!(parsed.domain, Some("example.com".to_string()));
        assert!(parsed.hosts.is_some());
        assert!(parsed.upstream.is_some());
        assert!(parsed.resolve().is_ok());
    }
}
