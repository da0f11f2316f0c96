//! HTTP server for `serve` mode.
//!
//! Plain HTTP only: the probe is meant to listen on an internal interface next
//! to the application it watches. The server includes graceful shutdown on
//! SIGTERM/SIGINT.

mod server;
mod shutdown;

pub use server::{start_server, ServerError};
