//! `lb-score`: track the load score of one gRPC backend.
//!
//! ```text
//! lb-score --address 127.0.0.1:9000 --once     one JSON snapshot, then exit
//! lb-score --config lb-score.toml              refresh until Ctrl-C
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::time;

use lb_score::config::{load_config, validation::validate_config, ConfigError, ScoreConfig};
use lb_score::observability::{logging, metrics};
use lb_score::report::GrpcDialer;
use lb_score::{BackendUnit, RefreshDriver, ServerSnapshot, Shutdown};

#[derive(Parser)]
#[command(name = "lb-score")]
#[command(about = "Track the load score reported by a gRPC backend", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logical service name.
    #[arg(short, long)]
    target: Option<String>,

    /// Backend address (host:port).
    #[arg(short, long)]
    address: Option<String>,

    /// Consecutive recoverable failures before eviction (0 = never).
    #[arg(long)]
    max_failures: Option<u32>,

    /// Seconds between refreshes.
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Print a single snapshot and exit.
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn into_config(self) -> Result<(ScoreConfig, bool), ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ScoreConfig::default(),
        };

        if let Some(target) = self.target {
            config.probe.target = target;
        }
        if let Some(address) = self.address {
            config.probe.address = address;
        }
        if let Some(max_failures) = self.max_failures {
            config.backend.max_failures = max_failures;
        }
        if let Some(interval_secs) = self.interval_secs {
            config.probe.interval_secs = interval_secs;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok((config, self.once))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, once) = Cli::parse().into_config()?;

    logging::init_logging(&config.observability);
    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?);
    }

    tracing::info!(
        service = %config.probe.target,
        address = %config.probe.address,
        max_failures = config.backend.max_failures,
        "Configuration loaded"
    );

    if once {
        let unit =
            BackendUnit::connect(&*config.probe.target, &*config.probe.address, &config.backend)
                .await?;
        print_snapshot(&unit.snapshot())?;
        unit.close()?;
        return Ok(());
    }

    let driver = RefreshDriver::new(GrpcDialer::new(), &config.probe, config.backend.clone());
    let watch = driver.watch();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(driver.run(shutdown.subscribe()));

    let mut ticker = time::interval(config.probe.interval());
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(snapshot) = watch.snapshot() {
                    print_snapshot(&snapshot)?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    shutdown.trigger();
    handle.await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn print_snapshot(snapshot: &ServerSnapshot) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(snapshot)?);
    Ok(())
}
