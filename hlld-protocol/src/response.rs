//! Response decoding.
//!
//! Replies come in two shapes:
//!
//! ```text
//! Done\n                        bare line (also `Exists`, `Delete in progress`,
//!                               or free-form error text)
//!
//! START\n                       block, only sent for `list`
//! <name> <f1> <f2> <f3> <count>\n
//! END\n
//! ```
//!
//! A reply may be split across any number of socket reads. [`ResponseDecoder`]
//! buffers bytes until one complete reply is present and consumes exactly
//! that reply.

use crate::error::ProtocolError;
use crate::{LIST_COUNT_INDEX, LIST_FIELD_COUNT, MAX_RESPONSE_SIZE};
use bytes::BytesMut;
use std::fmt;

pub const DONE: &[u8] = b"Done";
pub const EXISTS: &[u8] = b"Exists";
pub const DELETE_IN_PROGRESS: &[u8] = b"Delete in progress";
pub const BLOCK_START: &[u8] = b"START";
pub const BLOCK_END: &[u8] = b"END";

/// One decoded server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `Done`
    Done,
    /// `Exists`
    Exists,
    /// `Delete in progress`
    DeleteInProgress,
    /// Data lines between `START` and `END`.
    Block(Vec<String>),
    /// Any other line, usually an error message from the server.
    Other(String),
}

impl Response {
    pub fn is_done(&self) -> bool {
        matches!(self, Response::Done)
    }

    /// Succeeds only on a literal `Done`; anything else is returned as raw text.
    pub fn expect_done(self) -> Result<(), ProtocolError> {
        match self {
            Response::Done => Ok(()),
            other => Err(ProtocolError::UnexpectedResponse(other.to_string())),
        }
    }

    /// Extracts the set cardinality from a `list` block.
    ///
    /// The block must hold exactly one data line of five fields; the count is
    /// the fifth. The other fields are not interpreted.
    pub fn list_count(&self) -> Result<i64, ProtocolError> {
        let lines = match self {
            Response::Block(lines) => lines,
            other => return Err(ProtocolError::UnexpectedResponse(other.to_string())),
        };

        let [line] = lines.as_slice() else {
            return Err(ProtocolError::MalformedBlock(format!(
                "expected 1 data line, got {}",
                lines.len()
            )));
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != LIST_FIELD_COUNT {
            return Err(ProtocolError::UnexpectedFieldCount {
                expected: LIST_FIELD_COUNT,
                actual: fields.len(),
            });
        }

        let value = fields[LIST_COUNT_INDEX];
        value
            .parse::<i64>()
            .map_err(|source| ProtocolError::InvalidCount {
                value: value.to_string(),
                source,
            })
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Done => write!(f, "Done"),
            Response::Exists => write!(f, "Exists"),
            Response::DeleteInProgress => write!(f, "Delete in progress"),
            Response::Block(lines) => {
                writeln!(f, "START")?;
                for line in lines {
                    writeln!(f, "{}", line)?;
                }
                write!(f, "END")
            }
            Response::Other(raw) => f.write_str(raw),
        }
    }
}

/// Accumulates socket reads and yields complete replies.
pub struct ResponseDecoder {
    buffer: BytesMut,
    max_size: usize,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self::with_max_size(MAX_RESPONSE_SIZE)
    }

    /// Creates a decoder that rejects replies larger than `max_size` bytes.
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
            max_size,
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next complete reply from the buffer.
    ///
    /// Returns `Ok(None)` when more bytes are needed. On success only the
    /// bytes of that reply are consumed.
    pub fn decode(&mut self) -> Result<Option<Response>, ProtocolError> {
        let Some(first_end) = find_newline(&self.buffer, 0) else {
            return self.need_more();
        };

        if &self.buffer[..first_end] != BLOCK_START {
            let line = self.buffer.split_to(first_end + 1);
            let line = &line[..first_end];
            let response = if line == DONE {
                Response::Done
            } else if line == EXISTS {
                Response::Exists
            } else if line == DELETE_IN_PROGRESS {
                Response::DeleteInProgress
            } else {
                Response::Other(to_utf8(line)?.to_string())
            };
            return Ok(Some(response));
        }

        // Block: wait for a complete END line.
        let mut pos = first_end + 1;
        let mut data_lines = Vec::new();
        loop {
            let Some(end) = find_newline(&self.buffer, pos) else {
                return self.need_more();
            };
            if &self.buffer[pos..end] == BLOCK_END {
                pos = end + 1;
                break;
            }
            data_lines.push((pos, end));
            pos = end + 1;
        }

        let lines = data_lines
            .into_iter()
            .map(|(start, end)| to_utf8(&self.buffer[start..end]).map(str::to_string))
            .collect::<Result<Vec<_>, _>>();
        let _ = self.buffer.split_to(pos);
        Ok(Some(Response::Block(lines?)))
    }

    /// Decodes whatever is left once the peer has closed the stream.
    ///
    /// Returns `Ok(None)` when nothing was buffered. Leftover bytes that do not
    /// form a complete reply are a protocol error.
    pub fn finish(&mut self) -> Result<Option<Response>, ProtocolError> {
        if let Some(response) = self.decode()? {
            return Ok(Some(response));
        }
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let raw = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        if self.is_block_prefix(&raw) {
            Err(ProtocolError::MalformedBlock(format!("missing END: {:?}", raw)))
        } else {
            Err(ProtocolError::Truncated(raw))
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    fn is_block_prefix(&self, raw: &str) -> bool {
        raw.as_bytes().starts_with(BLOCK_START)
            && raw.as_bytes().get(BLOCK_START.len()) == Some(&b'\n')
    }

    fn need_more(&self) -> Result<Option<Response>, ProtocolError> {
        if self.buffer.len() > self.max_size {
            return Err(ProtocolError::ResponseTooLarge {
                size: self.buffer.len(),
                max: self.max_size,
            });
        }
        Ok(None)
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn find_newline(data: &[u8], from: usize) -> Option<usize> {
    data[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|pos| from + pos)
}

fn to_utf8(line: &[u8]) -> Result<&str, ProtocolError> {
    std::str::from_utf8(line).map_err(|_| ProtocolError::InvalidUtf8)
}
