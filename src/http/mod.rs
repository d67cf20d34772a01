//! HTTP protocol implementation.
//!
//! A deliberately small subset of HTTP/1.1: one `GET` per connection, no
//! headers read, no keep-alive.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection handler implementing the request-response state machine
//! - **`parser`**: Parses the request line out of a single read
//! - **`request`**: Request-line representation
//! - **`response`**: Status codes and the fixed response heads
//! - **`writer`**: Writes status, file and listing responses to the client
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │  Receiving  │ ← One bounded read, parse the request line
//!        └──────┬──────┘
//!               │ GET <target> HTTP/1.1      (favicon → 204, Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │    Resolving     │ ← Open the target inside the shared directory
//!        └──────┬───────────┘
//!               │ File or directory
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Stream the file or write the listing
//!        └──────┬───────────┘
//!               ├─ Success → Closed
//!               └─ Failure → Failed → (400 / 404 / 500 if nothing was sent yet) → Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use lanshare::http::connection::Connection;
//! use lanshare::sandbox::SandboxRoot;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let root = SandboxRoot::open(".").await?;
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, addr) = listener.accept().await?;
//!         let root = root.clone();
//!         tokio::spawn(async move {
//!             if let Err(e) = Connection::new(socket, addr, root).run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
