use std::process::exit;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};

use crtsh_exporter::config::{Cli, Config, ConfigError, Settings};
use crtsh_exporter::logger::init_logger;
use crtsh_exporter::server::{self, ServerState};
use crtsh_exporter::{
    BuildInfo, DomainCollector, ExporterCollector, ExporterError, Fetcher, HostsCollector,
    HttpTransport, RateLimiter, Registry,
};

fn load_settings(cli: &Cli) -> Result<Settings, ConfigError> {
    let mut config = Config::defaults();
    if let Some(file_config) = Config::load(cli.config.as_deref())? {
        config = config.merge_with(file_config);
    }
    config.merge_with(cli.to_config()).resolve()
}

fn build_registry(settings: &Settings) -> Result<Registry, ExporterError> {
    let mut registry = Registry::new();

    let info = BuildInfo::from_env();
    for name in info.missing() {
        info!("{} value unchanged: expected to be set during build", name);
    }
    registry.register(Box::new(ExporterCollector::new(info)?))?;

    #[cfg(target_os = "linux")]
    registry.register(Box::new(
        prometheus::process_collector::ProcessCollector::for_self(),
    ))?;

    let transport = Arc::new(HttpTransport::new(settings.timeout)?);
    let limiter = Arc::new(RateLimiter::new(settings.rate_per_second, settings.burst)?);
    let fetcher = Fetcher::new(transport, limiter)
        .with_base_url(settings.base_url.clone())
        .with_options(settings.search);

    if !settings.hosts.is_empty() {
        info!(
            "hosts={:?} Flag --hosts set and contains hosts, registering Hosts collector",
            settings.hosts
        );
        registry.register(Box::new(HostsCollector::new(
            settings.hosts.clone(),
            fetcher.clone(),
        )?))?;
    }

    if let Some(domain) = &settings.domain {
        info!(
            "domain={} Flag --domain set and contains domain, registering Domain collector",
            domain
        );
        registry.register(Box::new(DomainCollector::new(domain, fetcher)?))?;
    }

    if settings.hosts.is_empty() && settings.domain.is_none() {
        warn!("Neither --domain nor --hosts set; no certificate metrics will be exported");
    }

    Ok(registry)
}

fn main() {
    let cli = Cli::parse();

    if cli.generate_config {
        println!("{}", Config::example_toml());
        exit(0);
    }

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            exit(2);
        }
    };

    if let Err(e) = init_logger(settings.log_level, settings.log_format) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    // the blocking HTTP client must be created outside the async runtime
    let registry = match build_registry(&settings) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("Unable to create collectors: {}", e);
            exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Unable to start runtime: {}", e);
            exit(1);
        }
    };

    let state = ServerState {
        registry: Arc::clone(&registry),
        metrics_path: settings.path.clone(),
    };
    let result = runtime.block_on(server::serve(&settings.endpoint, state));
    drop(runtime);
    drop(registry);

    if let Err(e) = result {
        error!("Server failed: {}", e);
        exit(1);
    }
}
