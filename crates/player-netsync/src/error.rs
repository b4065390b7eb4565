//! Errors for the netsync wire protocol and master/slave state machines.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetsyncError {
    /// Message carried an unsupported protocol version.
    #[error("unsupported netsync protocol version {0}")]
    UnsupportedVersion(u8),

    /// Message's type byte did not match any known message kind.
    #[error("unknown netsync message type {0}")]
    UnknownMessageType(u8),

    /// Datagram was shorter than the message type it claims to be.
    #[error("truncated netsync message: expected at least {expected} bytes, got {got}")]
    TruncatedMessage { expected: usize, got: usize },

    /// A driver spec string (`s=`/`m=`/`p=` params) was malformed.
    #[error("invalid netsync spec: {0}")]
    InvalidSpec(String),

    /// The master/slave barrier did not complete before giving up.
    #[error("netsync barrier timed out waiting for {0}")]
    BarrierTimeout(&'static str),

    /// Propagated socket I/O failure.
    #[error("netsync I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NetsyncError>;
