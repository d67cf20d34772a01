//! Listening socket, per-connection tasks and graceful drain.

pub mod listener;

pub use listener::{bind, run};
