use thiserror::Error;

use crate::http::request::{Request, HTTP_VERSION, METHOD_GET};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty request")]
    Empty,
    #[error("request line has {0} tokens, expected 3")]
    TokenCount(usize),
    #[error("unsupported method {0:?}")]
    UnsupportedMethod(String),
    #[error("unsupported protocol version {0:?}")]
    UnsupportedVersion(String),
}

/// Parses the request line out of the bytes delivered by a single read.
///
/// Everything after the first CRLF is ignored. No reassembly happens: if the
/// client's request line did not arrive in full, whatever fragment did arrive
/// is what gets validated, and it will usually fail the token or version check.
pub fn parse_request_line(buf: &[u8]) -> Result<Request, ParseError> {
    if buf.is_empty() {
        return Err(ParseError::Empty);
    }

    let text = String::from_utf8_lossy(buf);
    let line = text.split("\r\n").next().unwrap_or_default();

    // Single spaces only: "GET  / HTTP/1.1" has four tokens.
    let tokens: Vec<&str> = line.split(' ').collect();
    let &[method, target, version] = tokens.as_slice() else {
        return Err(ParseError::TokenCount(tokens.len()));
    };

    if method != METHOD_GET {
        return Err(ParseError::UnsupportedMethod(method.to_string()));
    }
    if version != HTTP_VERSION {
        return Err(ParseError::UnsupportedVersion(version.to_string()));
    }

    Ok(Request::new(method, target, version))
}
