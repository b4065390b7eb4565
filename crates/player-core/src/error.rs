//! Error types for the player engine.
//!
//! All fallible operations in `player-core` return `Result<T, PlayerError>`:
//! usage mistakes, driver resolution/opening failures, incompatible driver
//! capability sets, pool exhaustion, decode failures, protocol errors, and
//! interruption (SIGINT), which is modeled as a normal-teardown signal, not
//! a fault.

use thiserror::Error;

/// Errors produced while configuring or running the playback pipeline.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// A driver spec string (`name[:params]`) or CLI argument was malformed.
    #[error("usage error: {0}")]
    UsageError(String),

    /// The driver registry has no entry matching the requested name in the
    /// given category.
    #[error("driver not found: {category} '{name}'")]
    DriverNotFound {
        /// Driver category (`codec`, `display`, `memman`, `pixconv`, `timer`).
        category: &'static str,
        /// The name that failed to resolve.
        name: String,
    },

    /// A driver's `open`/`enable` method rejected its configuration.
    #[error("driver open failed: {0}")]
    DriverOpenFailed(String),

    /// The capability intersection between display/memman/pixconv is empty
    /// (see the pixel-format pipeline's `PHYS_MEM` compatibility rule).
    #[error("incompatible drivers: {0}")]
    IncompatibleDrivers(String),

    /// The frame pool or another bounded resource could not be allocated.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The decode driver reported a fatal (non-concealable) error.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// A netsync message failed to parse or used an unsupported version.
    /// Logged and dropped at the point of occurrence; surfaced here only
    /// when the caller explicitly wants to observe it (e.g. in tests).
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// SIGINT was received. Not a fault: triggers the normal teardown path.
    #[error("interrupted")]
    Interrupted,

    /// Propagated I/O failure (file open, socket bind, etc).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout `player-core`.
pub type Result<T> = std::result::Result<T, PlayerError>;

impl PlayerError {
    /// Constructs a [`PlayerError::UsageError`]. Public so that
    /// out-of-tree drivers (in `player-drivers`, `player-netsync`, or
    /// elsewhere) can report malformed specs/params the same way.
    #[must_use]
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::UsageError(msg.into())
    }

    #[must_use]
    pub fn driver_open(msg: impl Into<String>) -> Self {
        Self::DriverOpenFailed(msg.into())
    }

    #[must_use]
    pub fn incompatible(msg: impl Into<String>) -> Self {
        Self::IncompatibleDrivers(msg.into())
    }

    #[must_use]
    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlayerError::DriverNotFound {
            category: "display",
            name: "fb0".to_string(),
        };
        assert_eq!(err.to_string(), "driver not found: display 'fb0'");

        let err = PlayerError::usage("missing input file");
        assert_eq!(err.to_string(), "usage error: missing input file");
    }

    #[test]
    fn test_interrupted_is_not_a_string_variant() {
        assert_eq!(PlayerError::Interrupted.to_string(), "interrupted");
    }
}
