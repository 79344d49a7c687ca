use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use sniper_watch::config::MetricsConfig;
use sniper_watch::plugins::notifiers::EmailNotifier;
use sniper_watch::plugins::traits::Notifier;
use sniper_watch::storage::{SqliteStore, Store};
use sniper_watch::utils::logging;
use sniper_watch::utils::sleeper::{Sleeper, TokioSleeper};
use sniper_watch::{AppConfig, Fetcher, ProviderRegistry, RunMode, Scheduler, SchedulerSettings};

const EXIT_CONFIG: u8 = 1;
const EXIT_STORE: u8 = 3;
const EXIT_NOTIFIER: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Delete the database and exit
    Clean,
    /// Record every item's current state once without notifications and exit
    Populate,
}

#[derive(Debug, Parser)]
#[command(name = "sniper-watch", version, about = "Watches shops for product availability and price drops")]
struct Cli {
    /// Omit to run continuously
    #[arg(value_enum, ignore_case = true)]
    mode: Option<Mode>,

    /// Configuration file layered over config/default and config/local
    #[arg(short, long, env = "SNIPER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let _log_guard = logging::init(&config.logging);
    info!("Starting Sniper Watch...");

    if cli.mode == Some(Mode::Clean) {
        return match SqliteStore::destroy(&config.database.path).await {
            Ok(()) => {
                info!(path = %config.database.path, "Database deleted");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(path = %config.database.path, error = %e, "Failed to delete database");
                ExitCode::from(EXIT_CONFIG)
            }
        };
    }

    let run_mode = match cli.mode {
        Some(Mode::Populate) => RunMode::Populate,
        _ => RunMode::Continuous,
    };

    let store = match open_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return ExitCode::from(EXIT_STORE);
        }
    };

    let notifier: Option<Arc<dyn Notifier>> =
        if run_mode == RunMode::Populate || !config.notifications.enabled {
            None
        } else {
            match EmailNotifier::from_config(&config.notifications.smtp) {
                Ok(notifier) => Some(Arc::new(notifier)),
                Err(e) => {
                    error!(error = %e, "Failed to initialize mail transport");
                    store.close().await;
                    return ExitCode::from(EXIT_NOTIFIER);
                }
            }
        };

    if let Err(e) = install_metrics(&config.metrics) {
        warn!(error = %e, "Metrics exporter disabled");
    }

    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
    let fetcher = match Fetcher::from_config(&config.scraper, sleeper.clone()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client");
            store.close().await;
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let registry = ProviderRegistry::with_builtin_providers();
    info!(providers = ?registry.provider_ids(), "Providers registered");
    let configured = config
        .searches
        .iter()
        .map(|search| (search.url.as_str(), search.provider.as_str()))
        .chain(
            config
                .products
                .iter()
                .map(|product| (product.url.as_str(), product.provider.as_str())),
        );
    for (url, provider) in configured {
        if !registry.is_registered(provider) {
            warn!(url, provider, "Unknown provider; this source will be skipped");
        }
    }

    let scheduler = Scheduler::new(
        fetcher,
        registry,
        store.clone(),
        notifier,
        sleeper,
        config.searches.clone(),
        SchedulerSettings::from_config(&config, run_mode),
    );

    tokio::select! {
        cycles = scheduler.run(None) => {
            info!(cycles, "Scheduler finished");
        }
        result = shutdown_signal() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutting down...");
        }
    }

    store.close().await;
    ExitCode::SUCCESS
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn Store>> {
    let store = SqliteStore::open(&config.database)
        .await
        .with_context(|| format!("opening {}", config.database.path))?;

    let seeded = store
        .upsert_many(&config.products)
        .await
        .context("seeding configured products")?;
    if seeded.mutations() > 0 {
        info!(inserted = seeded.inserted, updated = seeded.updated, "Seeded configured products");
    }

    Ok(Arc::new(store))
}

fn install_metrics(config: &MetricsConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.port))
        .install()
        .context("installing Prometheus exporter")?;

    info!(port = config.port, "Metrics exporter listening");
    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}
