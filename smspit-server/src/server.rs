//! Listener lifecycle
//!
//! Binds the capture and web listeners and runs an accept loop on each. Every
//! connection is served by hyper in its own task, tracked in a per-listener
//! `JoinSet`. On shutdown the listeners stop accepting, live subscribers are
//! released and open connections are asked to finish. Whatever is still open
//! after `shutdown_grace_secs` is aborted.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::routes::{api_router, web_router};
use crate::state::AppState;

/// Pause after a failed accept (e.g. out of file descriptors)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub struct Server {
    state: AppState,
    api_listener: TcpListener,
    web_listener: TcpListener,
}

impl Server {
    /// Build state and bind both listeners
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let api_addr = config.api_bind_addr();
        let web_addr = config.web_bind_addr();

        let api_listener = TcpListener::bind(&api_addr)
            .await
            .with_context(|| format!("Failed to bind API listener on {}", api_addr))?;
        let web_listener = TcpListener::bind(&web_addr)
            .await
            .with_context(|| format!("Failed to bind web listener on {}", web_addr))?;

        Ok(Self {
            state: AppState::new(config),
            api_listener,
            web_listener,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn api_addr(&self) -> Result<SocketAddr> {
        Ok(self.api_listener.local_addr()?)
    }

    pub fn web_addr(&self) -> Result<SocketAddr> {
        Ok(self.web_listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves, then drain within the grace period
    ///
    /// Returns once both listeners and all of their connections are gone.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Server {
            state,
            api_listener,
            web_listener,
        } = self;

        let (stop_tx, stop_rx) = watch::channel(false);
        let grace = Duration::from_secs(state.config.shutdown_grace_secs);

        let api = tokio::spawn(serve_listener(
            "API",
            api_listener,
            api_router(state.clone()),
            stop_rx.clone(),
            grace,
        ));
        let web = tokio::spawn(serve_listener(
            "Web",
            web_listener,
            web_router(state.clone()),
            stop_rx,
            grace,
        ));

        shutdown.await;
        info!("🛑 Shutting down...");

        let _ = stop_tx.send(true);
        state.broadcaster.close_all().await;

        for listener in [api, web] {
            if let Err(e) = listener.await {
                error!("Listener task failed: {}", e);
            }
        }

        Ok(())
    }
}

async fn serve_listener(
    name: &'static str,
    listener: TcpListener,
    router: Router,
    stop: watch::Receiver<bool>,
    grace: Duration,
) {
    let mut connections = JoinSet::new();
    let stopped = wait_for_stop(stop.clone());
    tokio::pin!(stopped);

    loop {
        tokio::select! {
            _ = &mut stopped => break,
            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    connections.spawn(serve_connection(socket, peer, router.clone(), stop.clone()));
                }
                Err(e) => {
                    warn!("{} listener failed to accept: {}", name, e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
    drop(listener);

    let drained = tokio::time::timeout(grace, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(
            "{}: grace period of {}s elapsed, closing {} remaining connections",
            name,
            grace.as_secs(),
            connections.len()
        );
        connections.shutdown().await;
    }
    info!("{} listener stopped", name);
}

async fn serve_connection(
    socket: TcpStream,
    peer: SocketAddr,
    router: Router,
    stop: watch::Receiver<bool>,
) {
    let service = TowerToHyperService::new(router);
    let conn = http1::Builder::new()
        .serve_connection(TokioIo::new(socket), service)
        .with_upgrades();
    tokio::pin!(conn);

    let stopped = wait_for_stop(stop);
    tokio::pin!(stopped);
    let mut draining = false;

    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    debug!("Connection from {} ended: {}", peer, e);
                }
                break;
            }
            _ = &mut stopped, if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}

async fn wait_for_stop(mut stop: watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
