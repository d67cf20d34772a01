use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::ServeError;
use crate::http::parser::{parse_request_line, ParseError};
use crate::http::request::Request;
use crate::http::writer::ResponseWriter;
use crate::sandbox::{normalize_target, Resolved, SandboxRoot};

/// Size of the one and only read performed per connection.
pub const REQUEST_BUFFER_SIZE: usize = 1024;

pub struct Connection<S = TcpStream> {
    stream: S,
    peer: SocketAddr,
    root: SandboxRoot,
    state: ConnectionState,
}

pub enum ConnectionState {
    Receiving,
    Resolving(Request),
    Dispatching(Request, Resolved),
    Failed(ServeError),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: SocketAddr, root: SandboxRoot) -> Self {
        Self {
            stream,
            peer,
            root,
            state: ConnectionState::Receiving,
        }
    }

    /// Serves exactly one request, then closes the stream.
    ///
    /// Every failure that still allows a response gets one. The returned error
    /// only reports what could not be told to the client: a transfer cut short
    /// after its head was sent, or an error response that failed to write.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut outcome = Ok(());

        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Receiving => {
                    self.state = match self.read_request().await {
                        Ok(req) if req.is_favicon() => {
                            ResponseWriter::new(&mut self.stream)
                                .write_no_content()
                                .await?;
                            ConnectionState::Closed
                        }
                        Ok(req) => ConnectionState::Resolving(req),
                        Err(e) => ConnectionState::Failed(e),
                    };
                }

                ConnectionState::Resolving(req) => {
                    let relative = normalize_target(&req.target);
                    self.state = match self.root.resolve(relative).await {
                        Ok(resolved) => ConnectionState::Dispatching(req, resolved),
                        Err(e) => ConnectionState::Failed(e),
                    };
                }

                ConnectionState::Dispatching(req, resolved) => {
                    self.state = match self.dispatch(&req, resolved).await {
                        Ok(()) => ConnectionState::Closed,
                        Err(e) => ConnectionState::Failed(e),
                    };
                }

                ConnectionState::Failed(err) => {
                    tracing::debug!(remote = %self.peer, error = %err, "Request failed");

                    match err.response() {
                        Some((status, body)) => {
                            ResponseWriter::new(&mut self.stream)
                                .write_status(status, body)
                                .await?;
                        }
                        None => outcome = Err(err.into()),
                    }
                }

                ConnectionState::Closed => break,
            }
        }

        // The peer may already be gone; the stream is dropped either way.
        let _ = self.stream.shutdown().await;

        outcome
    }

    /// Performs the single bounded read and parses the request line out of it.
    async fn read_request(&mut self) -> Result<Request, ServeError> {
        let mut buf = [0u8; REQUEST_BUFFER_SIZE];
        let n = self.stream.read(&mut buf).await.map_err(ServeError::Read)?;

        if n == 0 {
            return Err(ParseError::Empty.into());
        }

        Ok(parse_request_line(&buf[..n])?)
    }

    async fn dispatch(&mut self, req: &Request, resolved: Resolved) -> Result<(), ServeError> {
        let mut writer = ResponseWriter::new(&mut self.stream);

        match resolved {
            Resolved::File { entry, mut file } => {
                let sent = writer.write_file(&entry, &mut file).await?;
                tracing::info!(
                    resource = %entry.name,
                    remote = %self.peer,
                    bytes = sent,
                    "Sent file"
                );
            }
            Resolved::Directory { entry, listing } => {
                writer
                    .write_listing(&req.target, &listing)
                    .await
                    .map_err(ServeError::StreamInterrupted)?;
                tracing::info!(
                    resource = %entry.name,
                    remote = %self.peer,
                    entries = listing.len(),
                    "Sent directory"
                );
            }
        }

        Ok(())
    }
}
