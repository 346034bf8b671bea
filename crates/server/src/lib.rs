//! HTTP front end for the comicglass library.
//!
//! | Route             | Response                                               |
//! |-------------------|--------------------------------------------------------|
//! | `GET /?path=<rel>`| HTML index of `<rel>` (relative to the library root)   |
//! | `GET /.cache`     | JSON [`CacheStats`](comicglass_cache::CacheStats), only when enabled |
//! | anything else     | The file at that path inside the library root, or 404  |
//!
//! Listings come from the shared [`DirectoryCache`]; files are streamed
//! straight from disk.

pub mod error;
mod page;
mod routes;

pub use crate::page::IndexPage;
use crate::error::{ErrorKind, Result};
use axum::Router;
use axum::routing::get;
use comicglass_cache::DirectoryCache;
use comicglass_config::ListingOrder;
use exn::ResultExt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    cache: Arc<DirectoryCache>,
    root: Arc<Path>,
    order: ListingOrder,
    page: Arc<IndexPage>,
}
impl AppState {
    pub fn new(cache: Arc<DirectoryCache>, root: impl Into<PathBuf>, order: ListingOrder) -> Result<Self> {
        Ok(Self { cache, root: Arc::from(root.into()), order, page: Arc::new(IndexPage::new()?) })
    }
}

/// Builds the application router. `inspect` mounts the `/.cache` endpoint.
pub fn router(state: AppState, inspect: bool) -> Router {
    let mut router = Router::new().route("/", get(routes::index));
    if inspect {
        router = router.route("/.cache", get(routes::cache_stats));
    }
    router.fallback(routes::library_file).layer(TraceLayer::new_for_http()).with_state(state)
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr).await.or_raise(|| ErrorKind::Bind(addr))
}

/// Serves `router` on `listener` until `shutdown` resolves, then lets
/// in-flight requests finish.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Listening");
    }
    axum::serve(listener, router).with_graceful_shutdown(shutdown).await.or_raise(|| ErrorKind::Serve)
}
