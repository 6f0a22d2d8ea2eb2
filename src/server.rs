//! HTTP server and graceful shutdown.
//!
//! SIGTERM or Ctrl-C stops the accept loop at once. Connections already
//! open keep being served until they finish, then [`Server::serve`] returns
//! so `main` can close the database pool.

use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::response::Response;
use crate::router::Router;

/// Largest request body buffered for a handler.
const MAX_BODY: usize = 1024 * 1024;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    pub fn bind(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Accepts connections and serves them through `router` until a shutdown
    /// signal arrives and every open connection has drained.
    pub async fn serve<S: Clone + Send + Sync + 'static>(self, router: Router<S>) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        let router = Arc::new(router);
        let mut connections = JoinSet::new();

        info!("server started at http://{}...", self.addr);

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(Arc::clone(&router), stream, peer));
                    }
                    Err(e) => error!("accept error: {e}"),
                },

                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        info!(open = connections.len(), "shutting down, draining connections");
        while connections.join_next().await.is_some() {}
        info!("server stopped");
        Ok(())
    }
}

/// Serves every request on one connection, HTTP/1.1 or HTTP/2.
async fn serve_connection<S: Clone + Send + Sync + 'static>(
    router: Arc<Router<S>>,
    stream: TcpStream,
    peer: SocketAddr,
) {
    let service = service_fn(move |req| dispatch(Arc::clone(&router), req));
    if let Err(e) = auto::Builder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(stream), service)
        .await
    {
        error!(%peer, "connection error: {e}");
    }
}

/// Buffers the body and hands the request to the router. Every failure is
/// already a response here, so hyper never sees an error.
async fn dispatch<S: Clone + Send + Sync + 'static>(
    router: Arc<Router<S>>,
    req: hyper::Request<Incoming>,
) -> std::result::Result<http::Response<Full<Bytes>>, Infallible> {
    info!("Request: {} {}", req.method(), req.uri().path());

    let (parts, body) = req.into_parts();
    let response = match read_body(body, MAX_BODY).await {
        Ok(body) => router.respond(http::Request::from_parts(parts, body)).await,
        Err(status) => Response::status(status),
    };
    Ok(response.into_inner())
}

/// Collects at most `limit` bytes of `body`. A longer body is `413`, a
/// broken one `400`.
async fn read_body<B>(body: B, limit: usize) -> std::result::Result<Bytes, StatusCode>
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!("request body over {limit} bytes");
            Err(StatusCode::PAYLOAD_TOO_LARGE)
        }
        Err(e) => {
            warn!("failed to read request body: {e}");
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

/// Resolves on the first SIGTERM or SIGINT. A handler that cannot be
/// installed is logged and never fires.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("received Ctrl-C"),
        () = terminate => info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bodies_within_the_limit_are_buffered() {
        let body = Full::new(Bytes::from_static(b"{\"name\":\"Tom\"}"));
        assert_eq!(read_body(body, 16).await, Ok(Bytes::from_static(b"{\"name\":\"Tom\"}")));
        assert_eq!(read_body(Full::new(Bytes::new()), 0).await, Ok(Bytes::new()));
    }

    #[tokio::test]
    async fn oversized_bodies_are_413() {
        let body = Full::new(Bytes::from(vec![b'x'; MAX_BODY + 1]));
        assert_eq!(read_body(body, MAX_BODY).await, Err(StatusCode::PAYLOAD_TOO_LARGE));
    }
}
