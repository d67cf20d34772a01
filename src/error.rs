//! Failure kinds of a single request and the response each one maps to.

use thiserror::Error;

use crate::http::parser::ParseError;
use crate::http::response::StatusCode;

#[derive(Debug, Error)]
pub enum ServeError {
    /// The single read failed or returned nothing.
    #[error("failed to read request: {0}")]
    Read(#[source] std::io::Error),

    /// The request line did not parse or named something other than `GET ... HTTP/1.1`.
    #[error("malformed request: {0}")]
    MalformedRequest(#[from] ParseError),

    /// The target could not be opened or stat'ed inside the shared directory.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Something failed before any part of a 200 response was written.
    #[error("internal failure: {0}")]
    Internal(#[source] std::io::Error),

    /// Writing failed after a 200 head was already on the wire.
    #[error("response interrupted after headers were sent: {0}")]
    StreamInterrupted(#[source] std::io::Error),
}

impl ServeError {
    /// Maps a failure to the status and body to send.
    ///
    /// Returns `None` when a status line has already been sent: the connection
    /// is just closed, and the client sees a body shorter than its
    /// `Content-Length` instead of a second status line.
    pub fn response(&self) -> Option<(StatusCode, &'static str)> {
        match self {
            ServeError::Read(_) => Some((StatusCode::BadRequest, "Bad Request")),
            ServeError::MalformedRequest(ParseError::Empty) => {
                Some((StatusCode::BadRequest, "Bad Request"))
            }
            ServeError::MalformedRequest(_) => Some((StatusCode::BadRequest, "")),
            ServeError::ResourceNotFound(_) => Some((StatusCode::NotFound, "Not Found")),
            ServeError::Internal(_) => Some((StatusCode::ServerError, "Server Error")),
            ServeError::StreamInterrupted(_) => None,
        }
    }
}
