//! # alaredis-server
//!
//! Wires the sharded engine ([`alaredis_engine`]) to an HTTP front door,
//! a request-metrics aggregator, a command-line interface, and an optional
//! snapshot persister. The binary entry point lives in `main.rs`; this
//! library crate exists so the HTTP layer's router can be exercised with
//! `tower::ServiceExt::oneshot` in tests without spinning up a socket.

pub mod cli;
pub mod http;
pub mod metrics;
pub mod persister;

pub use cli::Cli;
pub use http::{router, AppState};
pub use metrics::Metrics;
