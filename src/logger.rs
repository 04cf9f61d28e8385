//! Logger initialization.
//!
//! `env_logger` reads `RUST_LOG` first, falling back to `info`. An explicitly
//! configured level overrides both. Plain output is meant for terminals, JSON
//! lines for log shippers.

use std::io::Write;

use clap::ValueEnum;
use env_logger::Env;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

const DEFAULT_FILTER: &str = "info";

/// Initializes the global logger.
///
/// Returns an error if a logger was already installed.
pub fn init_logger(
    level: Option<LevelFilter>,
    format: LogFormat,
) -> Result<(), log::SetLoggerError> {
    let env = Env::default().default_filter_or(DEFAULT_FILTER);
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("hyper_util", LevelFilter::Info);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{{\"ts\":{},\"level\":\"{}\",\"target\":\"{}\",\"msg\":{}}}",
                    chrono::Utc::now().timestamp_millis(),
                    record.level(),
                    record.target(),
                    serde_json::to_string(&record.args().to_string())
                        .unwrap_or_else(|_| "\"\"".into())
                )
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{} {:<5} {} {}",
                    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                    record.level(),
                    record.target(),
                    record.args()
                )
            });
        }
    }

    builder.try_init()
}
