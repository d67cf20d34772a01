use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::error::ServeError;
use crate::http::response::{attachment_head, StatusCode};
use crate::sandbox::{DirectoryListing, ResolvedEntry};

/// Renders responses directly onto a connection.
///
/// Nothing is buffered beyond what a single call assembles; each method
/// writes and flushes before returning.
pub struct ResponseWriter<'a, W> {
    stream: &'a mut W,
}

impl<'a, W> ResponseWriter<'a, W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(stream: &'a mut W) -> Self {
        Self { stream }
    }

    /// Bare status head followed by an optional plain-text body.
    pub async fn write_status(&mut self, status: StatusCode, body: &str) -> std::io::Result<()> {
        let mut buf = status.status_head().into_bytes();
        buf.extend_from_slice(body.as_bytes());

        self.stream.write_all(&buf).await?;
        self.stream.flush().await
    }

    pub async fn write_no_content(&mut self) -> std::io::Result<()> {
        self.write_status(StatusCode::NoContent, "").await
    }

    /// Attachment head, then the file's bytes copied verbatim.
    ///
    /// Returns the number of body bytes written. Any failure here is
    /// `StreamInterrupted`: the 200 head may already be on the wire.
    pub async fn write_file<R>(
        &mut self,
        entry: &ResolvedEntry,
        file: &mut R,
    ) -> Result<u64, ServeError>
    where
        R: AsyncRead + Unpin,
    {
        let head = attachment_head(&entry.name, entry.size);
        self.stream
            .write_all(head.as_bytes())
            .await
            .map_err(ServeError::StreamInterrupted)?;

        let copied = tokio::io::copy(file, &mut *self.stream)
            .await
            .map_err(ServeError::StreamInterrupted)?;
        self.stream
            .flush()
            .await
            .map_err(ServeError::StreamInterrupted)?;

        if copied != entry.size {
            tracing::warn!(
                resource = %entry.name,
                advertised = entry.size,
                copied,
                "File changed size while being sent"
            );
        }

        Ok(copied)
    }

    /// 200 head, the `you asked for` line, then one line per entry.
    pub async fn write_listing(
        &mut self,
        target: &str,
        listing: &DirectoryListing,
    ) -> std::io::Result<()> {
        let mut body = StatusCode::Ok.status_head();
        body.push_str(&format!("you asked for {}\n\n", target));
        for entry in &listing.entries {
            body.push_str(&entry.to_string());
            body.push('\n');
        }

        self.stream.write_all(body.as_bytes()).await?;
        self.stream.flush().await
    }
}
