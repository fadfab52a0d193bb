//! Executor worker process
//!
//! Started by the master with `--host`, `--master-port` and `--worker-id`;
//! everything after `--` is the test runner command.
//!
//! ```bash
//! concolic-worker --master-port 40200 --worker-id 0 -- java -cp runtime.jar TestRunner
//! ```

use clap::Parser;
use concolic_engine::config::EngineConfig;
use concolic_executor::{CommandTestRunner, ExecutorError, ExecutorWorker};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "concolic-worker")]
#[command(about = "Run generated tests for an executor master", long_about = None)]
struct Cli {
    /// Master host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Master worker port
    #[arg(long)]
    master_port: u16,

    /// Id the master launched this worker under
    #[arg(long, default_value_t = 0)]
    worker_id: usize,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Test runner command and arguments
    #[arg(last = true)]
    runner: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(served) => {
            info!(served, "worker exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "worker failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> concolic_executor::Result<usize> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_yaml_file(path)?,
        None => EngineConfig::default(),
    };
    let Some((command, args)) = cli.runner.split_first() else {
        return Err(ExecutorError::new(
            concolic_executor::ErrorKind::Config,
            "no test runner command given after --",
        ));
    };
    let runner = CommandTestRunner::new(
        command.clone(),
        args.to_vec(),
        Duration::from_secs(config.executor.communication_timeout_secs),
    );
    let worker =
        ExecutorWorker::connect(&cli.host, cli.master_port, cli.worker_id, &config.executor, runner)
            .await?;
    Ok(worker.run().await)
}
