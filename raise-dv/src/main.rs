//! raise-dv (Dataset Verification) - Main entry point
//!
//! Reads verification requests as line-delimited JSON on stdin, evaluates
//! each dataset against the FAIR evaluation service and writes category
//! reports as line-delimited JSON on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use raise_common::config::{ConfigResolver, ConfigSource, FailurePolicy};
use raise_common::{logging, StdioQueue};
use raise_dv::settings::{self, Overrides};
use tokio::signal;
use tracing::{error, info, warn};

/// Command-line arguments for raise-dv
#[derive(Parser, Debug)]
#[command(name = "raise-dv")]
#[command(about = "Dataset verification worker for RAISE")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (e.g. "info", "raise_dv=debug")
    #[arg(long, env = "RAISE_DV_LOG_LEVEL")]
    log_level: Option<String>,

    /// Indicator → category JSON file
    #[arg(long, env = "RAISE_DV_INDICATORS")]
    indicators: Option<PathBuf>,

    /// Evaluation service endpoint
    #[arg(long, env = "RAISE_DV_ENDPOINT")]
    endpoint: Option<String>,

    /// Evaluation collection name
    #[arg(long, env = "RAISE_DV_COLLECTION")]
    collection: Option<String>,

    /// Prefix for bare subject identifiers ("" sends them verbatim)
    #[arg(long, env = "RAISE_DV_SUBJECT_PREFIX")]
    subject_prefix: Option<String>,

    /// Evaluation request timeout in seconds
    #[arg(long, env = "RAISE_DV_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Inbound queue name
    #[arg(long, env = "RAISE_DV_VERIFICATION_QUEUE")]
    verification_queue: Option<String>,

    /// Response queue name
    #[arg(long, env = "RAISE_DV_RESPONSE_QUEUE")]
    response_queue: Option<String>,

    /// Inbound field holding the subject identifier
    #[arg(long, env = "RAISE_DV_SUBJECT_FIELD")]
    subject_field: Option<String>,

    /// Inbound/outbound field holding the instance identifier
    #[arg(long, env = "RAISE_DV_INSTANCE_ID_FIELD")]
    instance_id_field: Option<String>,

    /// What to do after an evaluation service failure
    #[arg(long, value_enum, env = "RAISE_DV_ON_EVALUATION_FAILURE")]
    on_evaluation_failure: Option<PolicyArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    Continue,
    Terminate,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Continue => FailurePolicy::Continue,
            PolicyArg::Terminate => FailurePolicy::Terminate,
        }
    }
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            log_level: self.log_level.clone(),
            indicators_path: self.indicators.clone(),
            endpoint: self.endpoint.clone(),
            collection: self.collection.clone(),
            subject_prefix: self.subject_prefix.clone(),
            timeout_secs: self.timeout_secs,
            verification_queue: self.verification_queue.clone(),
            response_queue: self.response_queue.clone(),
            subject_field: self.subject_field.clone(),
            instance_id_field: self.instance_id_field.clone(),
            on_evaluation_failure: self.on_evaluation_failure.map(FailurePolicy::from),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(run(args));
    // A pending stdin read cannot be cancelled; do not wait for it on shutdown
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

async fn run(args: Args) -> Result<()> {
    // Config is resolved before tracing exists: it carries the log settings
    let resolver = ConfigResolver::new("raise-dv", "RAISE_DV_CONFIG");
    let (config, source) = resolver
        .resolve(args.config.as_deref())
        .context("Failed to load configuration")?;
    let config = settings::apply_overrides(config, args.overrides());

    logging::init_tracing(&config.logging)?;

    info!(
        "Starting RAISE Dataset Verification (raise-dv) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &source {
        ConfigSource::CommandLine(path)
        | ConfigSource::Environment(path)
        | ConfigSource::UserFile(path) => info!("Configuration: {}", path.display()),
        ConfigSource::CompiledDefaults => warn!("No config file found - using compiled defaults"),
    }

    let queue = Arc::new(StdioQueue::stdio(&config.queues.verification));
    let worker = match raise_dv::build_worker(&config, queue) {
        Ok(worker) => worker,
        Err(e) => {
            error!("Startup failed: {}", e);
            return Err(e.into());
        }
    };

    let stats = worker.run_until(shutdown_signal()).await?;
    info!(
        "Processed {} messages ({} published, {} discarded, {} failed)",
        stats.received, stats.published, stats.discarded, stats.failed
    );
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
