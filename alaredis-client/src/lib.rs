//! # alaredis Sync Client
//!
//! Provide a lightweight, synchronous JSON client for the HTTP front door,
//! grounded on the pack's `hkv-client` facade but re-expressed over HTTP:
//! `reqwest::blocking::Client` already keeps a connection pool per host, so
//! this crate adapts `KVClient`'s facade-pattern API without reimplementing
//! pooling or a wire protocol by hand.

mod client;

pub use client::{ClientConfig, ClientError, ClientResult, KVClient};
