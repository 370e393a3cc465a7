//! Error types for the IRC client engine.

use thiserror::Error;

/// Convenience type alias for Results using [`ClientError`].
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Every failure the engine surfaces to the embedding application.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// An operation that requires a live connection was called without one.
    #[error("not connected")]
    NotConnected,

    /// `connect` was called while a connection is already up.
    #[error("already connected")]
    AlreadyConnected,

    /// A required string argument was empty.
    #[error("invalid argument: {0} must not be empty")]
    InvalidArgument(&'static str),

    /// The constructor identity is incomplete (empty nick or user).
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A channel operation was given a name that is not a channel.
    #[error("not a channel: {0}")]
    NotAChannel(String),

    /// The named channel is not currently tracked (self is not in it).
    #[error("channel not tracked: {0}")]
    ChannelNotTracked(String),

    /// The requested nick exceeds the server's advertised NICKLEN.
    #[error("nickname too long: {nick} ({len} > {max})")]
    NickTooLong {
        /// The rejected nickname.
        nick: String,
        /// Its length in bytes.
        len: usize,
        /// The server's NICKLEN limit.
        max: u32,
    },

    /// Username and real name are fixed for the lifetime of a connection.
    #[error("cannot change {0} while connected")]
    InUseWhileConnected(&'static str),

    /// A malformed inbound line or `005` token.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server terminated the session with an `ERROR` line.
    #[error("server error: {0}")]
    Server(String),

    /// `433` arrived and no registered handler resolved the collision.
    #[error("nickname in use and unhandled: {0}")]
    NickInUseUnhandled(String),

    /// I/O error on the underlying socket.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Shorthand for a [`ClientError::Protocol`] with a formatted message.
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        ClientError::Protocol(msg.into())
    }
}
