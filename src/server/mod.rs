//! The HTTP facade: a small JSON API over the record store.
//!
//! Each request gets its own `Store` (and so its own `Sheet` client) built from the shared
//! `Backend`. Requests do not share any state besides the credentials.

mod routes;

use crate::api::Backend;
use crate::error::{ErrorType, IntoResult};
use crate::store::{Clock, Store, SystemClock};
use crate::Result;
use anyhow::Context;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use routes::Reply;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Request bodies larger than this are refused with 413.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// What every request handler needs.
#[derive(Clone)]
pub struct AppState {
    backend: Backend,
    clock: Arc<dyn Clock>,
    max_body: usize,
}

impl AppState {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            clock: Arc::new(SystemClock),
            max_body: MAX_BODY_BYTES,
        }
    }

    /// Replaces the request body limit, `MAX_BODY_BYTES` by default.
    pub fn with_max_body(mut self, bytes: usize) -> Self {
        self.max_body = bytes;
        self
    }

    pub(crate) fn store(&self) -> Store {
        Store::with_clock(self.backend.sheet(), self.clock.clone())
    }
}

/// Binds `port` on all interfaces and serves until Ctrl-C is pressed.
pub(crate) async fn serve(state: AppState, port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Unable to listen on port {port}"))
        .pub_result(ErrorType::Service)?;
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Unable to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    run_server(state, listener, shutdown).await
}

/// Accepts connections on `listener` until `shutdown` completes. Connections that are already open
/// finish on their own tasks.
pub(crate) async fn run_server(
    state: AppState,
    listener: TcpListener,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .context("Unable to read the listener address")
        .pub_result(ErrorType::Service)?;
    info!(
        "Serving spreadsheet {} ({} mode) on http://{addr}/api",
        state.backend.spreadsheet_id(),
        state.backend.mode()
    );
    let state = Arc::new(state);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Failed to accept a connection: {e}");
                        continue;
                    }
                };
                let state = state.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| handle(state.clone(), req));
                    if let Err(e) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        debug!("Connection from {peer} ended with an error: {e}");
                    }
                });
            }
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }
    Ok(())
}

async fn handle(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let body = match read_body(req.into_body(), state.max_body).await {
        Ok(body) => body,
        Err(reply) => {
            warn!("{method} {path}: request body refused with {}", reply.status.as_u16());
            return Ok(reply.into_response());
        }
    };
    let reply = routes::route(&state, &method, &path, &body).await;
    info!("{method} {path} {}", reply.status.as_u16());
    Ok(reply.into_response())
}

/// Collects `body`, refusing it once it grows past `limit` bytes.
async fn read_body<B>(body: B, limit: usize) -> std::result::Result<Bytes, Reply>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(Reply::message(
            StatusCode::PAYLOAD_TOO_LARGE,
            false,
            "Request body too large",
        )),
        Err(e) => {
            debug!("Unable to read a request body: {e}");
            Err(Reply::message(
                StatusCode::BAD_REQUEST,
                false,
                "Unable to read the request body",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{TestSheet, TestSheetState};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_serves_over_http() {
        let id = "server_over_http";
        TestSheet::set_state(id, TestSheetState::default());
        let state = AppState::new(Backend::Test {
            spreadsheet_id: id.to_string(),
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(run_server(state, listener, async {
            let _ = stopped.await;
        }));

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{addr}/api/savings"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"][0]["name"], "Emergency Fund");

        let text = client
            .get(format!("http://{addr}/api"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(text, "Expense Tracker API is running");

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_read_body_limit() {
        let body = read_body(Full::new(Bytes::from_static(b"{}")), 2).await.unwrap();
        assert_eq!(body, Bytes::from_static(b"{}"));

        let reply = read_body(Full::new(Bytes::from_static(b"{ }")), 2)
            .await
            .unwrap_err();
        assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_oversized_body_is_refused() {
        let id = "server_oversized_body";
        TestSheet::set_state(id, TestSheetState::default());
        let state = AppState::new(Backend::Test {
            spreadsheet_id: id.to_string(),
        })
        .with_max_body(64);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(run_server(state, listener, async {
            let _ = stopped.await;
        }));

        let name = "x".repeat(100);
        let goal = format!(r#"{{"id": "g9", "name": "{name}", "target": 10}}"#);
        let response = reqwest::Client::new()
            .post(format!("http://{addr}/api/savings"))
            .body(goal)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Request body too large");
        assert_eq!(TestSheet::get_state(id).unwrap(), TestSheetState::default());

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
