use crate::http::request::HTTP_VERSION;

/// HTTP status codes the server can emit.
///
/// This set is closed: no other code ever goes on the wire.
/// - `Ok` (200): file download or directory listing
/// - `NoContent` (204): favicon probe
/// - `BadRequest` (400): malformed or unsupported request line
/// - `NotFound` (404): target missing or outside the shared directory
/// - `ServerError` (500): directory could not be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 500 Server Error
    ServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use lanshare::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::ServerError => 500,
        }
    }

    /// Returns the reason phrase sent after the code.
    ///
    /// Note that 500 is "Server Error", not the usual "Internal Server Error".
    ///
    /// # Example
    ///
    /// ```
    /// # use lanshare::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::ServerError.reason_phrase(), "Server Error");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::ServerError => "Server Error",
        }
    }

    /// Renders the bare status head: status line plus the empty line that ends
    /// the (absent) header block.
    pub fn status_head(&self) -> String {
        format!(
            "{} {} {}\r\n\r\n",
            HTTP_VERSION,
            self.as_u16(),
            self.reason_phrase()
        )
    }
}

/// Renders the head of an attachment response for a file of `size` bytes.
///
/// These three headers are the only ones the server ever sends. The file name
/// goes out as a quoted-string: `"` and `\` are backslash-escaped and control
/// characters are replaced with `_`, so a name can never end the header early.
pub fn attachment_head(file_name: &str, size: u64) -> String {
    format!(
        "{} 200 OK\r\nContent-Disposition: attachment;filename=\"{}\"\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        HTTP_VERSION,
        quote_file_name(file_name),
        size
    )
}

fn quote_file_name(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            c if c.is_control() => quoted.push('_'),
            c => quoted.push(c),
        }
    }
    quoted
}
