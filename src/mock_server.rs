//! Stand-in for the upstream API during contract tests.
//!
//! Serves one canned response at [`BREEDS_PATH`]. The fixture is read on every request, so it
//! can be swapped between test runs without restarting the server.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};

/// The only route the mock answers.
pub const BREEDS_PATH: &str = "/v2/breeds";

#[derive(Clone)]
struct MockState {
    fixture: Arc<PathBuf>,
}

/// Build the mock's router, serving the file at `fixture`.
pub fn router(fixture: impl Into<PathBuf>) -> Router {
    Router::new()
        .route(BREEDS_PATH, get(breeds))
        .fallback(not_found)
        .with_state(MockState {
            fixture: Arc::new(fixture.into()),
        })
}

async fn breeds(State(state): State<MockState>) -> Response {
    match tokio::fs::read(state.fixture.as_path()).await {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => {
            tracing::warn!(fixture = %state.fixture.display(), %err, "mock file not readable");
            (StatusCode::NOT_FOUND, "Mock file not found").into_response()
        }
    }
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// A bound, not yet serving, mock server.
///
/// The port is held from [`MockServer::bind`] until [`MockServer::serve_with_shutdown`]
/// returns or the server is dropped. Binding fails if another process holds the port.
pub struct MockServer {
    listener: TcpListener,
    router: Router,
}

impl MockServer {
    /// Bind `addr`. Use port 0 to let the OS pick a free port.
    pub async fn bind(addr: impl ToSocketAddrs, fixture: impl Into<PathBuf>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            router: router(fixture),
        })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` resolves, then release the port.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        tracing::info!("mock server listening on http://{addr}");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("mock server on {addr} stopped");
        Ok(())
    }
}
