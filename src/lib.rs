//! lanshare - single-directory file sharing over a minimal HTTP/1.1
//!
//! Core library: request-line parsing, sandboxed path resolution, response
//! rendering, and the accept loop with graceful drain.

pub mod config;
pub mod error;
pub mod http;
pub mod sandbox;
pub mod server;
