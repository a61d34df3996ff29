//! Error taxonomy for the EDI receive path and the PHY encoder.

/// Errors produced anywhere in this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A PFT/AF/ETI structure violated the wire format it claims to be.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A CRC check (AF, PFT RS, ETI EOH/EOF) failed.
    #[error("CRC mismatch in {context}: expected {expected:04x}, got {got:04x}")]
    Crc {
        /// What was being checked, e.g. "AF packet" or "ETI EOF".
        context: &'static str,
        /// The CRC carried on the wire.
        expected: u16,
        /// The CRC actually computed.
        got: u16,
    },

    /// A fragment, AF packet, or ETI frame could not be assembled from the
    /// pieces seen so far, and never will be (e.g. too many fragments lost
    /// for Reed-Solomon to recover, or a TAG item overruns its packet).
    #[error("assembly failed: {0}")]
    Assemble(String),

    /// A configuration value is invalid or an unsupported combination of
    /// parameters (e.g. a protection profile/bitrate combination with no
    /// puncturing rule) was requested.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An internal invariant was violated. Reaching this means a bug in this
    /// crate, not bad input.
    #[error("internal invariant violated: {0}")]
    Invariant(String),

    /// A transient condition (e.g. a fragment arriving too late, a dropped
    /// AF packet) that the caller should treat as a single lost frame rather
    /// than a fatal error.
    #[error("transient loss: {0}")]
    TransientLoss(String),

    /// I/O failure reading/writing files or sockets.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stream was used in a way the block scheduler forbids (e.g.
    /// read/write handles shared past their expected refcount).
    #[error("stream error: {0}")]
    Stream(String),
}

impl Error {
    /// Build a [`Error::Protocol`] from a formatted message.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Build a [`Error::Assemble`] from a formatted message.
    pub fn assemble(msg: impl Into<String>) -> Self {
        Self::Assemble(msg.into())
    }

    /// Build a [`Error::Config`] from a formatted message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`Error::Invariant`] from a formatted message.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Build a generic message error, used where callers used to reach for
    /// `anyhow`-style ad hoc strings.
    pub fn msg(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Build a [`Error::TransientLoss`] from a formatted message.
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientLoss(msg.into())
    }
}

impl From<std::array::TryFromSliceError> for Error {
    fn from(e: std::array::TryFromSliceError) -> Self {
        Error::Invariant(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Error::Stream(e.to_string())
    }
}
