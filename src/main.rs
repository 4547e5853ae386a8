//! `minihttp` binary: serve a directory or fetch one document over UDP.

mod cli;

use std::{sync::Arc, time::Duration};

use clap::Parser;
use cli::{Cli, Command, GetArgs, ServeArgs};
use minihttp::{
    Client,
    ResourcePath,
    Server,
    config::SessionConfig,
    store::DirectoryStore,
    transport::UdpTransport,
};

/// File name used when the requested path has no final segment.
const INDEX_FILE: &str = "index.html";

#[tokio::main]
async fn main() -> minihttp::Result<()> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Some(addr) = cli.metrics_addr {
        install_metrics_exporter(addr);
    }
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Get(args) => get(args).await,
    }
}

async fn serve(args: ServeArgs) -> minihttp::Result<()> {
    let transport = UdpTransport::bind(args.bind).await?;
    tracing::info!(
        addr = %transport.local_addr()?,
        root = %args.root.display(),
        "serving documents"
    );
    Server::new(Arc::new(transport), Arc::new(DirectoryStore::new(args.root)))
        .run()
        .await?;
    Ok(())
}

async fn get(args: GetArgs) -> minihttp::Result<()> {
    let path = ResourcePath::normalize(&args.path, &args.default_path)?;
    let transport = UdpTransport::bind(args.bind).await?;
    let config = SessionConfig::default()
        .request_timeout(Duration::from_secs(args.timeout))
        .max_attempts(args.attempts);
    let mut client = Client::new(Arc::new(transport), args.server).with_config(config);

    let content = client.fetch(path.clone()).await?;

    tokio::fs::create_dir_all(&args.out).await?;
    let target = args.out.join(path.file_name().unwrap_or(INDEX_FILE));
    tokio::fs::write(&target, &content).await?;
    tracing::info!(file = %target.display(), bytes = content.len(), "document saved");
    Ok(())
}

#[cfg(feature = "metrics")]
fn install_metrics_exporter(addr: std::net::SocketAddr) {
    let installed = metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install();
    match installed {
        Ok(()) => tracing::info!(%addr, "prometheus exporter listening"),
        Err(error) => tracing::warn!(%addr, %error, "prometheus exporter not installed"),
    }
}

#[cfg(not(feature = "metrics"))]
fn install_metrics_exporter(addr: std::net::SocketAddr) {
    tracing::warn!(%addr, "built without the metrics feature; exporter disabled");
}
