use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lanshare::config::Config;
use lanshare::sandbox::SandboxRoot;
use lanshare::server::listener;

#[derive(Parser, Debug)]
#[command(
    name = "lanshare",
    version,
    about = "Share a directory over HTTP on the local network"
)]
struct Cli {
    /// Port to listen on (1-65535; ports below 1024 need root)
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Directory to share [default: current directory]
    #[arg(long)]
    root: Option<PathBuf>,

    /// Address to bind [default: 0.0.0.0]
    #[arg(long)]
    host: Option<IpAddr>,

    /// YAML config file (also read from LANSHARE_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let mut cfg = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        cfg.port = port;
    }
    if let Some(root) = cli.root {
        cfg.root = root;
    }
    if let Some(host) = cli.host {
        cfg.host = host;
    }
    cfg.validate()?;

    let root = SandboxRoot::open(&cfg.root).await?;
    let socket = listener::bind(&cfg).await?;

    tracing::info!(dir = %root.path().display(), "Serving directory over HTTP");
    tracing::info!("-- http://localhost:{}", cfg.port);
    tracing::info!("-- listening on {}", socket.local_addr()?);

    listener::run(socket, root, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Could not listen for interrupt; serving until killed");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    })
    .await?;

    println!("\nServer Shutdown");
    Ok(())
}
