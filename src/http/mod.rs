//! HTTP server module.
//!
//! The API is served over plain HTTP; TLS, if any, is terminated in front of
//! the container. The server includes:
//! - Graceful shutdown on SIGTERM/SIGINT

mod server;
mod shutdown;

pub use server::{start_server, ServerError};
