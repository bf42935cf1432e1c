// ABOUTME: Crate-wide error type covering transport, protocol, and lifecycle failures
// ABOUTME: Every fallible public operation returns the shared Result alias defined here

use thiserror::Error;

/// Errors produced by the client's public operations.
///
/// Variants correspond one-to-one with the error kinds a caller can
/// observe: connection teardown, subscription timeouts and premature
/// closure, transport-level I/O or decode failures, and errors the agent
/// itself reported.
#[derive(Debug, Error)]
pub enum Error {
    /// The client has been closed (explicitly, or because the transport
    /// failed); the operation was never sent, or was in flight when
    /// shutdown happened.
    #[error("client is closed")]
    ClientClosed,

    /// A subscription's initial reply did not arrive within its deadline.
    #[error("request timed out waiting for initial reply")]
    RequestTimeout,

    /// A subscription handler was cleaned up before it ever received an
    /// initial reply, typically because the client shut down first.
    #[error("subscription closed before it was established")]
    StreamClosed,

    /// Underlying I/O or message decode failure. Terminates the reader
    /// loop and triggers client close.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The agent reported a non-empty error string in a response header.
    #[error("agent error: {0}")]
    Agent(String),

    /// A frame could not be interpreted: an unrecognized query record
    /// tag, or a body that failed to decode into the expected shape.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Error::Transport(std::io::Error::other(err))
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Error::Transport(std::io::Error::other(err))
    }
}

/// Result alias used throughout the crate's public API.
pub type Result<T> = std::result::Result<T, Error>;
