//! HTTP server wrapper shared by every node kind

use crate::shutdown::ShutdownCoordinator;
use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A node's router bound to its address, not yet listening
pub struct NodeServer {
    name: String,
    addr: String,
    router: Router,
}

impl NodeServer {
    pub fn new(name: impl Into<String>, addr: impl Into<String>, router: Router) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
            router,
        }
    }

    /// Bind the listener and serve in the background until `shutdown` fires
    pub async fn start(self, shutdown: &ShutdownCoordinator) -> Result<RunningServer> {
        let NodeServer { name, addr, router } = self;

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("{} failed to bind {}", name, addr))?;
        let local_addr = listener.local_addr()?;
        info!(node = %name, %local_addr, "Listening");

        let mut shutdown_rx = shutdown.subscribe();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
        });

        Ok(RunningServer {
            name,
            local_addr,
            handle,
        })
    }
}

/// A server task started by [`NodeServer::start`]
#[derive(Debug)]
pub struct RunningServer {
    name: String,
    local_addr: SocketAddr,
    handle: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the server to drain, aborting it after `timeout`
    pub async fn join(self, timeout: Duration) -> Result<()> {
        let abort = self.handle.abort_handle();
        match tokio::time::timeout(timeout, self.handle).await {
            Ok(joined) => {
                joined
                    .with_context(|| format!("{} server task panicked", self.name))?
                    .with_context(|| format!("{} server failed", self.name))?;
                info!(node = %self.name, "Server stopped");
            }
            Err(_) => {
                warn!(node = %self.name, ?timeout, "Server did not drain in time, aborting");
                abort.abort();
            }
        }
        Ok(())
    }
}
