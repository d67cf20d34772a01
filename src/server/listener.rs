use std::future::Future;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::sandbox::SandboxRoot;

/// Binds the listening socket described by `cfg`.
pub async fn bind(cfg: &Config) -> anyhow::Result<TcpListener> {
    let addr = cfg.listen_addr();
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("could not start listener on {}", addr))
}

/// Accepts connections until `shutdown` resolves, then drains.
///
/// Every accepted connection is served on its own task; there is no cap on
/// how many run at once. When `shutdown` resolves the listener is closed at
/// once, so new connections are refused, and this returns only after every
/// handler already running has finished. Handlers are never cancelled.
///
/// An accept failure is not retried: it ends the loop the same way, and is
/// returned once the drain completes.
pub async fn run<F>(listener: TcpListener, root: SandboxRoot, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let mut handlers = JoinSet::new();
    let mut result = Ok(());
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }

            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                        result = Err(anyhow::Error::new(e).context("accept failed"));
                        break;
                    }
                };
                debug!(remote = %peer, "Accepted connection");

                let root = root.clone();
                handlers.spawn(async move {
                    if let Err(e) = Connection::new(socket, peer, root).run().await {
                        warn!(remote = %peer, error = %e, "Connection error");
                    }
                });
            }
        }

        // Reap finished handlers so the set only holds live ones.
        while let Some(joined) = handlers.try_join_next() {
            report_panic(joined);
        }
    }

    drop(listener);

    if !handlers.is_empty() {
        info!(in_flight = handlers.len(), "Waiting for in-flight connections");
    }
    while let Some(joined) = handlers.join_next().await {
        report_panic(joined);
    }
    info!("All connections drained");

    result
}

fn report_panic(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Connection task panicked");
    }
}
