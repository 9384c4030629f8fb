//! Static file server with live reload.
//!
//! Serves the build directory and pushes reload notifications to connected
//! browsers over Server-Sent Events. HTML responses get a small client
//! script injected that listens for those events.

use crate::category::AssetCategory;
use crate::config::ServerConfig;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Router};
use futures::Stream;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::services::ServeDir;

/// Path of the event stream.
pub const EVENTS_PATH: &str = "/__assetflow/events";

/// Path of the reload client script.
pub const CLIENT_PATH: &str = "/__assetflow/client.js";

const CLIENT_JS: &str = r#"(function () {
  if (!window.EventSource) { return; }
  var source = new EventSource("/__assetflow/events");
  source.addEventListener("reload", function () {
    window.location.reload();
  });
  source.addEventListener("css", function () {
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    Array.prototype.forEach.call(links, function (link) {
      var url = new URL(link.href, window.location.href);
      url.searchParams.set("assetflow", Date.now().toString());
      link.href = url.toString();
    });
  });
})();
"#;

/// What connected browsers should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    /// Reload the page
    Full,
    /// Re-fetch stylesheets only
    Css,
}

impl ReloadKind {
    /// SSE event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            ReloadKind::Full => "reload",
            ReloadKind::Css => "css",
        }
    }
}

/// A reload notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadEvent {
    pub kind: ReloadKind,
    pub category: AssetCategory,
}

impl ReloadEvent {
    /// The notification to send after a category was rebuilt.
    pub fn for_category(category: AssetCategory) -> Self {
        let kind = match category {
            AssetCategory::Style => ReloadKind::Css,
            _ => ReloadKind::Full,
        };
        Self { kind, category }
    }
}

/// Fan-out point for reload notifications.
///
/// Cloning is cheap; every clone sends to the same set of clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadEvent>,
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new(16)
    }
}

impl ReloadHub {
    /// Create a hub buffering up to `capacity` events per slow client.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Notify every connected client. Returns how many received it.
    pub fn notify(&self, event: ReloadEvent) -> usize {
        let delivered = self.tx.send(event).unwrap_or(0);
        tracing::debug!(
            event = event.kind.event_name(),
            category = %event.category,
            clients = delivered,
            "reload sent"
        );
        delivered
    }

    /// Subscribe to notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    /// Number of connected clients.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Error starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The address could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    /// The server stopped with an error
    #[error("Server error: {0}")]
    Serve(#[source] io::Error),
}

/// A bound, not yet running, reload server.
pub struct ReloadServer {
    listener: TcpListener,
    router: Router,
    addr: SocketAddr,
}

impl ReloadServer {
    /// Bind the configured address. Port 0 picks a free port.
    pub async fn bind(
        config: &ServerConfig,
        root: PathBuf,
        hub: ReloadHub,
    ) -> Result<Self, ServerError> {
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
        let local = listener.local_addr().map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self { listener, router: router(root, hub, config.inject_client), addr: local })
    }

    /// Address the server listens on.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL for browsers.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Serve until the process exits.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!(addr = %self.addr, "reload server listening");
        axum::serve(self.listener, self.router).await.map_err(ServerError::Serve)
    }
}

/// Build the router: event stream, client script, and the build directory.
pub fn router(root: PathBuf, hub: ReloadHub, inject: bool) -> Router {
    let router = Router::new()
        .route(EVENTS_PATH, get(events))
        .route(CLIENT_PATH, get(client_script))
        .fallback_service(ServeDir::new(root))
        .with_state(hub);

    if inject {
        router.layer(middleware::map_response(inject_client))
    } else {
        router
    }
}

async fn events(
    State(hub): State<ReloadHub>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = futures::stream::unfold(hub.subscribe(), |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let sse = Event::default()
                        .event(event.kind.event_name())
                        .data(event.category.label());
                    return Some((Ok(sse), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "reload client lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn client_script() -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/javascript"), (CACHE_CONTROL, "no-cache")], CLIENT_JS)
}

async fn inject_client(response: Response) -> Response {
    let is_html = response.status() == StatusCode::OK
        && response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/html"))
            .unwrap_or(false);
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("failed to read html response: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_reload_script(&bytes);
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Insert the client script tag before the last `</body>`, or append it.
///
/// Works on raw bytes so pages in any ASCII-compatible encoding pass
/// through unchanged apart from the tag.
pub fn inject_reload_script(html: &[u8]) -> Vec<u8> {
    const CLOSE_BODY: &[u8] = b"</body>";
    let tag = format!("<script src=\"{}\"></script>", CLIENT_PATH);

    let index = html
        .windows(CLOSE_BODY.len())
        .rposition(|window| window.eq_ignore_ascii_case(CLOSE_BODY))
        .unwrap_or(html.len());

    let mut out = Vec::with_capacity(html.len() + tag.len());
    out.extend_from_slice(&html[..index]);
    out.extend_from_slice(tag.as_bytes());
    out.extend_from_slice(&html[index..]);
    out
}
