/// The only method the server answers.
pub const METHOD_GET: &str = "GET";

/// The only protocol version the server accepts, and the one it answers with.
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Represents the request line of a client request.
///
/// Only the first line is ever parsed: headers and bodies are not modeled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The request method, e.g. "GET"
    pub method: String,
    /// The request target as sent by the client (e.g., "/docs/readme.txt")
    pub target: String,
    /// Protocol version token (must be "HTTP/1.1" to be served)
    pub version: String,
}

impl Request {
    pub fn new(
        method: impl Into<String>,
        target: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            version: version.into(),
        }
    }

    /// Browsers probe for this on their own; it is answered without touching the filesystem.
    pub fn is_favicon(&self) -> bool {
        self.target == "/favicon.ico"
    }
}
