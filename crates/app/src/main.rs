// CLI modules
mod args;
mod op;
mod ops;
mod state;
mod transport;

use std::path::PathBuf;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Identity, Init, Inspect, Share, Version, View};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

command_enum! {
    (Identity, Identity),
    (Init, Init),
    (Inspect, Inspect),
    (Share, Share),
    (Version, Version),
    (View, View),
}

/// Log to stderr, and to daily files when `log_dir` is set.
///
/// Stdout is reserved for command output. The returned guards flush the
/// writers on drop and must outlive every log call.
fn init_logging(level: tracing::Level, log_dir: Option<PathBuf>) -> Vec<WorkerGuard> {
    let mut guards = Vec::new();

    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    guards.push(stderr_guard);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stderr_writer)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        );

    match log_dir {
        Some(log_dir) => {
            if let Err(e) = std::fs::create_dir_all(&log_dir) {
                eprintln!("Warning: Failed to create log directory {:?}: {}", log_dir, e);
            }
            let file_appender = tracing_appender::rolling::daily(&log_dir, "sealshare.log");
            let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
            guards.push(file_guard);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(tracing::Level::INFO.into())
                        .from_env_lossy(),
                );

            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(file_layer)
                .init();
        }
        None => tracing_subscriber::registry().with(stderr_layer).init(),
    }

    guards
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_dir = state::AppState::load(args.config_path.clone())
        .ok()
        .and_then(|state| state.logs_dir());
    let guards = init_logging(args.log_level, log_dir);

    let build = common::build_info!();
    tracing::debug!(version = build.version, repo_version = ?build.repo_version, "sealshare starting");

    let ctx = match op::OpContext::new(args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to create HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let result = args.command.execute(&ctx).await;
    drop(guards);
    match result {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
