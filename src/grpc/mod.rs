//! gRPC surface of the service.
//!
//! Requests are validated field by field before reaching [`Auth`]; core
//! errors are mapped to status codes without leaking internal detail.

mod handler;
pub mod validate;

pub mod pb {
    #![allow(clippy::doc_markdown, clippy::derive_partial_eq_without_eq)]
    tonic::include_proto!("sso.v1");
}

pub use self::handler::{server, AuthHandler};

use crate::auth::Auth;
use anyhow::{Context, Result};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

/// Serve the `Auth` service on `listener` until `shutdown` resolves.
///
/// Every call is cancelled once `request_timeout` elapses.
///
/// # Errors
/// Returns an error if the transport fails.
pub async fn serve<F>(
    listener: TcpListener,
    auth: Arc<Auth>,
    request_timeout: Duration,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let addr = listener.local_addr().context("listener has no local address")?;
    info!("Listening on {addr}");

    let layer = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_grpc()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .into_inner();

    Server::builder()
        .timeout(request_timeout)
        .layer(layer)
        .add_service(server(auth))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await
        .context("gRPC server failed")?;

    info!("Gracefully shutdown");

    Ok(())
}
