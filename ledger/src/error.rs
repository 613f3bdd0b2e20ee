use std::fmt;

/// Errors produced by the block layer.
#[derive(Debug)]
pub enum BlockError {
    /// Malformed buffer: bad length, truncated stream, or invalid UTF-8.
    Decode(String),
    /// Serialized payload exceeds the hard size ceiling.
    Oversize { len: usize, max: usize },
    /// A field the checksum algorithm requires is absent.
    MissingField(&'static str),
    /// Signing-key material could not be used.
    Crypto(String),
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockError::Decode(msg) => write!(f, "decode error: {msg}"),
            BlockError::Oversize { len, max } => {
                write!(f, "payload is {len} bytes, exceeds the {max}-byte ceiling")
            }
            BlockError::MissingField(name) => write!(f, "required field absent: {name}"),
            BlockError::Crypto(msg) => write!(f, "crypto error: {msg}"),
        }
    }
}

impl std::error::Error for BlockError {}
