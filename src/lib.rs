//! todo-api: a todo list JSON API with user accounts.
//!
//! Users register and obtain bearer tokens under `/auth`, then manage their own
//! todos under `/todos`. Data lives in MySQL (or in memory for development and
//! tests). The crate also ships the `probe` used by the container health checks.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod middleware;
pub mod probe;
pub mod routes;
pub mod state;
pub mod store;

pub use error::AppError;
