//! Error types for the IRC client.
//!
//! This module defines the error taxonomy used across the crate:
//! line decoding failures, connection establishment failures, mid-session
//! transport failures, and handler failures.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::event::Event;

/// Errors produced while decoding a single protocol line.
///
/// Decode errors are always recovered locally: the offending line is
/// dropped, no event is emitted, and the read loop continues.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The line could not be split into a command and parameters.
    #[error("malformed line")]
    MalformedLine,

    /// Line exceeded the maximum allowed length.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    LineTooLong {
        /// Actual line length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// Invalid UTF-8 bytes in the line.
    #[error("invalid UTF-8 in line at byte {0}")]
    InvalidUtf8(usize),
}

/// Errors produced by the framed wire codec.
///
/// Splits I/O failures (terminal for the session) from per-line decode
/// failures (recoverable, the line is skipped).
#[derive(Debug, Error)]
pub enum WireError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A single line failed to decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Errors surfaced synchronously from connection establishment.
///
/// The client performs no retries; a failed dial is returned to the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectError {
    /// The connection did not complete within the fixed ceiling.
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    /// DNS, TCP, or TLS handshake failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The server address could not be used as a TLS server name.
    #[error("invalid server name: {0}")]
    InvalidServerName(String),
}

/// Mid-session transport failure.
///
/// Terminal for the read loop; surfaced from [`Client::run`].
///
/// [`Client::run`]: crate::Client::run
#[derive(Debug, Error)]
pub enum TransportError {
    /// Read side of the connection failed.
    #[error("read error: {0}")]
    Read(#[source] std::io::Error),

    /// Write side of the connection failed.
    #[error("write error: {0}")]
    Write(#[source] std::io::Error),
}

/// Errors returned by a handler invocation.
///
/// Handler errors are isolated per invocation: they are reported through
/// `tracing` and never propagate to the dispatcher or to other handlers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandlerError {
    /// The outgoing write channel is closed (session torn down).
    #[error("write channel closed")]
    WriteClosed,

    /// Send failure on the outgoing write channel.
    #[error("send error: {0}")]
    Send(#[from] mpsc::error::SendError<Event>),

    /// Handler-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Top-level client errors returned by session operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Connection establishment failed.
    #[error("connect error: {0}")]
    Connect(#[from] ConnectError),

    /// The session ended with a transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The operation requires a live connection.
    #[error("not connected")]
    NotConnected,
}
