//! Command encoding.
//!
//! Every command is a single line: `<verb> <key>[ <arg>...]\n`. Arguments are
//! joined with single spaces in the order given. The protocol has no escape
//! mechanism, so keys and values must not contain spaces or newlines; the
//! encoder passes them through untouched.

use crate::attributes::SetAttributes;
use bytes::{BufMut, BytesMut};
use std::fmt;

/// Protocol verbs understood by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Create,
    Drop,
    Set,
    Bulk,
    List,
}

impl Verb {
    /// Returns the verb as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Create => "create",
            Verb::Drop => "drop",
            Verb::Set => "set",
            Verb::Bulk => "bulk",
            Verb::List => "list",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encodes `verb`, `key` and `args` into one newline-terminated command line.
pub fn encode<I, S>(verb: Verb, key: &str, args: I) -> BytesMut
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let verb = verb.as_str();
    let mut buf = BytesMut::with_capacity(verb.len() + key.len() + 2);
    buf.put_slice(verb.as_bytes());
    buf.put_u8(b' ');
    buf.put_slice(key.as_bytes());
    for arg in args {
        buf.put_u8(b' ');
        buf.put_slice(arg.as_ref().as_bytes());
    }
    buf.put_u8(b'\n');
    buf
}

/// A typed command ready to be rendered onto the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Command<'a> {
    Create {
        key: &'a str,
        attributes: Option<&'a SetAttributes>,
    },
    Drop {
        key: &'a str,
    },
    Set {
        key: &'a str,
        value: &'a str,
    },
    Bulk {
        key: &'a str,
        values: Vec<&'a str>,
    },
    List {
        key: &'a str,
    },
}

impl<'a> Command<'a> {
    pub fn verb(&self) -> Verb {
        match self {
            Command::Create { .. } => Verb::Create,
            Command::Drop { .. } => Verb::Drop,
            Command::Set { .. } => Verb::Set,
            Command::Bulk { .. } => Verb::Bulk,
            Command::List { .. } => Verb::List,
        }
    }

    pub fn key(&self) -> &'a str {
        match self {
            Command::Create { key, .. }
            | Command::Drop { key }
            | Command::Set { key, .. }
            | Command::Bulk { key, .. }
            | Command::List { key } => *key,
        }
    }

    /// Renders the command line, including the trailing newline.
    pub fn encode(&self) -> BytesMut {
        let verb = self.verb();
        let key = self.key();
        match self {
            Command::Create { attributes, .. } => {
                let args = attributes.map(SetAttributes::to_args).unwrap_or_default();
                encode(verb, key, args)
            }
            Command::Set { value, .. } => encode(verb, key, [*value]),
            Command::Bulk { values, .. } => encode(verb, key, values.iter()),
            Command::Drop { .. } | Command::List { .. } => {
                encode(verb, key, std::iter::empty::<&str>())
            }
        }
    }
}
