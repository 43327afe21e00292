//! # Transport Error Types

use thiserror::Error;

/// Errors that can occur on a peer link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// A frame could not be decoded into an action.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The stream failed while the link was connected.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// No peer is connected.
    #[error("not connected")]
    NotConnected,

    /// The link has already left the idle state.
    #[error("link already in use")]
    AlreadyConnected,

    /// Listening socket could not be opened.
    #[error("failed to bind {addr}: {reason}")]
    Bind {
        /// Requested address.
        addr: String,
        /// OS error text.
        reason: String,
    },

    /// Joiner could not reach the host.
    #[error("failed to connect to {addr}: {reason}")]
    Connect {
        /// Requested address.
        addr: String,
        /// OS error text.
        reason: String,
    },
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
