//! # hlld-protocol
//!
//! Wire protocol implementation for the hlld text protocol.
//!
//! This crate provides:
//! - Newline-terminated command encoding
//! - Set creation attributes (`precision=`, `eps=`, `in_memory=`)
//! - Incremental response decoding for bare-line and START/END block replies
//! - Protocol error types
//!
//! Nothing here performs I/O; `hlld-client` drives the socket.

pub mod attributes;
pub mod command;
pub mod error;
pub mod response;

pub use attributes::SetAttributes;
pub use command::{encode, Command, Verb};
pub use error::ProtocolError;
pub use response::{Response, ResponseDecoder};

/// Default port for an hlld server.
pub const DEFAULT_PORT: u16 = 4553;

/// Maximum size of a single buffered response (1 MiB).
pub const MAX_RESPONSE_SIZE: usize = 1024 * 1024;

/// Number of whitespace-separated fields on a `list` data line.
pub const LIST_FIELD_COUNT: usize = 5;

/// Index of the set cardinality within a `list` data line.
pub const LIST_COUNT_INDEX: usize = 4;
