pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sealshare")]
#[command(about = "Encrypt files and share them with a single signed link")]
pub struct Args {
    /// Path to the sealshare config directory (defaults to ~/.sealshare)
    #[arg(long, global = true, env = "SEALSHARE_DIR")]
    pub config_path: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: crate::Command,
}
