//! Server Error Types
//!
//! [`ErrorKind`] covers what can go wrong starting or running the server.
//! [`HttpError`] is what a request handler answers with; it deliberately
//! carries nothing but the status, so no filesystem details leak to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use comicglass_cache::error::Error as CacheError;
use derive_more::{Display, Error};
use std::net::SocketAddr;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("failed to bind to {_0}")]
    Bind(#[error(not(source))] SocketAddr),
    #[display("server terminated unexpectedly")]
    Serve,
    #[display("failed to render template")]
    Template,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    /// 400, for anything the client asked for that isn't a listable
    /// directory inside the library.
    PathDoesNotExist,
    /// 500, details are logged instead of returned.
    Internal,
}
impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self {
            Self::PathDoesNotExist => (StatusCode::BAD_REQUEST, "Path does not exist").into_response(),
            Self::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response(),
        }
    }
}
impl From<CacheError> for HttpError {
    fn from(err: CacheError) -> Self {
        if err.is_client_error() {
            tracing::debug!(error = ?err, "Requested path is not a directory");
            return Self::PathDoesNotExist;
        }
        tracing::error!(error = ?err, "Failed to list directory");
        Self::Internal
    }
}
impl From<Error> for HttpError {
    fn from(err: Error) -> Self {
        tracing::error!(error = ?err, "Request failed");
        Self::Internal
    }
}
