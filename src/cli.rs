//! Command line interface for the `minihttp` binary.
//!
//! Shared with `build.rs`, which renders the man page, so it depends on
//! nothing but `clap` and `std`.

use std::{net::SocketAddr, path::PathBuf};

use clap::{Args, Parser, Subcommand};

/// Command line arguments for the `minihttp` binary.
#[derive(Debug, Parser)]
#[command(
    name = "minihttp",
    version,
    about = "Serve and fetch HTML documents over a 200-byte datagram link"
)]
pub struct Cli {
    /// Expose Prometheus metrics on this address.
    #[arg(long, global = true, env = "MINIHTTP_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve files from a directory.
    Serve(ServeArgs),
    /// Fetch one document and save it.
    Get(GetArgs),
}

/// Arguments of `minihttp serve`.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:4403")]
    pub bind: SocketAddr,
    /// Directory holding the documents.
    #[arg(long, env = "MINIHTTP_HTML_DIR", default_value = "html")]
    pub root: PathBuf,
}

/// Arguments of `minihttp get`.
#[derive(Debug, Args)]
pub struct GetArgs {
    /// Path to fetch; empty input falls back to `--default-path`.
    #[arg(default_value = "")]
    pub path: String,
    /// Server address.
    #[arg(long, short)]
    pub server: SocketAddr,
    /// Local address to send from.
    #[arg(long, default_value = "0.0.0.0:0")]
    pub bind: SocketAddr,
    /// Path requested when none is given.
    #[arg(long, env = "MINIHTTP_DEFAULT_PATH", default_value = "/index.html")]
    pub default_path: String,
    /// Directory the document is saved to.
    #[arg(long, default_value = "downloads")]
    pub out: PathBuf,
    /// Seconds to wait for progress before an attempt times out.
    #[arg(long, env = "MINIHTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout: u64,
    /// Attempts before giving up.
    #[arg(long, default_value_t = 3)]
    pub attempts: u32,
}
