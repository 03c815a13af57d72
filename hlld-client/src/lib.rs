//! # hlld-client
//!
//! Client library for hlld.
//!
//! This crate provides:
//! - A single-socket TCP connection with connect and per-request timeouts
//! - Typed operations: `create`, `drop`, `set`, `bulk`, `list`
//! - A typed error taxonomy separating transport, semantic and protocol failures
//!
//! The protocol is strictly request/response. Operations take `&mut self`, so
//! one handle carries at most one command in flight. Nothing is retried
//! internally: a `KeyDeleteInProgress` answer is returned to the caller, who
//! decides whether to wait and try again.

pub mod client;
pub mod connection;
pub mod error;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;
pub use hlld_protocol::{ProtocolError, Response, SetAttributes};
