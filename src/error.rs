//! Error types for the Mini Games Hub client.

use thiserror::Error;

/// Errors that can occur when using the Mini Games Hub client.
#[derive(Debug, Error)]
pub enum HubError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted an operation that requires an active connection, but the client is not connected.
    #[error("not connected to server")]
    NotConnected,

    /// Attempted a room operation but the client is not in a room.
    #[error("not in a room")]
    NotInRoom,

    /// The server rejected a request. Carries the server's message verbatim.
    #[error("request rejected: {message}")]
    Rejected {
        /// Human-readable error message from the server.
        message: String,
    },

    /// A Hangman guess was suppressed locally because the letter was already guessed.
    #[error("letter already guessed")]
    AlreadyGuessed,

    /// A Hangman guess was suppressed locally because the round has already been lost.
    #[error("round is over")]
    RoundOver,

    /// The operation requires a started game.
    #[error("game has not started")]
    GameNotStarted,

    /// A draw was attempted while the local player is not the drawer.
    #[error("local player is not the drawer")]
    NotDrawer,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for Mini Games Hub client operations.
pub type Result<T> = std::result::Result<T, HubError>;
