//! Clipconv - single-file media conversion
//!
//! Entry point: loads configuration, sets up logging and runs one command.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use clipconv::cli::{Args, Commands};
use clipconv::config::Config;
use clipconv::media::{build_plan, FfmpegRunner, RunnerFactory};
use clipconv::task::TaskOrchestrator;

const DEFAULT_CONFIG_FILE: &str = "clipconv.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Convert(request_args) => {
            let request = request_args.into_request();
            let runner = RunnerFactory::create_runner(config.engine.clone());
            let orchestrator = Arc::new(TaskOrchestrator::new(config.storage.clone(), runner));

            let handle = orchestrator.spawn(request);
            info!("Started conversion task {}", handle.task_id());
            let result = handle.wait().await;

            println!("{}", serde_json::to_string(&result)?);
            if !result.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Plan(request_args) => {
            let request = request_args.into_request();
            let input_path = config.storage.input_dir.join(&request.input_file);
            let plan = build_plan(
                &request,
                &input_path,
                &config.storage.output_dir,
                &uuid::Uuid::nil(),
            );

            for (index, invocation) in plan.invocations.iter().enumerate() {
                println!("# {}. {}", index + 1, invocation.description);
                println!("{} {}", config.engine.binary_path, shell_join(&invocation.args));
            }
            println!("# output: {}", plan.output_path.display());
        }
        Commands::Check => {
            let runner = FfmpegRunner::new(config.engine.clone());
            runner.check_availability().await?;
            println!("{}", runner.version_info().await?);
        }
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".clipconv").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation
    let file_appender = rolling::daily(&log_dir, "clipconv.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // stdout carries command output, so console logs go to stderr
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("clipconv.log").display());

    Ok(())
}

/// Quote arguments that a shell would split
fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || ";[]'\"".contains(c)) {
                format!("'{}'", arg.replace('\'', "'\\''"))
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
