//! Executor master process
//!
//! # Usage
//!
//! ```bash
//! concolic-master --config concolic.yaml --controller-port 40123
//! ```

use clap::Parser;
use concolic_engine::config::EngineConfig;
use concolic_engine::features::concolic::CancellationToken;
use concolic_executor::{ExecutorMaster, ProcessWorkerLauncher};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "concolic-master")]
#[command(about = "Proxy test execution requests to isolated worker processes", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Controller to announce the client port to
    #[arg(long)]
    controller_port: Option<u16>,

    /// Override `executor.workers`
    #[arg(short, long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "master failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> concolic_executor::Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_yaml_file(path)?,
        None => EngineConfig::default(),
    };
    let mut executor = config.executor;
    if let Some(workers) = cli.workers {
        executor.workers = workers;
    }
    executor.validate()?;

    let launcher = Arc::new(ProcessWorkerLauncher::from_config(&executor));
    let mut master = ExecutorMaster::bind(&executor, launcher).await?;
    if let Some(port) = cli.controller_port {
        master.announce(port).await?;
    }
    info!(
        client_port = master.client_port()?,
        worker_port = master.worker_port()?,
        "master listening"
    );

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });
    master.run(shutdown).await;
    Ok(())
}
