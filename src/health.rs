//! Liveness endpoint for hosting platforms that require an open port.
//!
//! Served by axum on a dedicated OS thread with its own tokio runtime. It
//! shares no state with the poll loop; answering at all is the signal.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::thread;

use axum::{routing::get, Router};
use log::{error, info};

pub fn router() -> Router {
    Router::new()
        .route("/", get(|| async { "Bot is running!" }))
        .route("/health", get(|| async { "ok" }))
}

/// Bind `addr` and serve the endpoint in the background.
///
/// Binding happens on the calling thread so that a busy port is reported
/// immediately. Returns the bound address (useful with port 0).
pub fn spawn(addr: SocketAddr) -> io::Result<SocketAddr> {
    let listener = TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;
    let local = listener.local_addr()?;

    thread::Builder::new()
        .name("health".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!("health endpoint runtime failed: {e}");
                    return;
                }
            };

            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(l) => l,
                    Err(e) => {
                        error!("health endpoint listener failed: {e}");
                        return;
                    }
                };
                info!("health endpoint listening on {local}");
                if let Err(e) = axum::serve(listener, router()).await {
                    error!("health endpoint stopped: {e}");
                }
            });
        })?;

    Ok(local)
}
