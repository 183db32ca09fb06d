//! Protocol verb and numeric constants.
//!
//! Commands the client itself reacts to or produces, plus the two
//! pseudo-event names used to drive session-lifecycle handlers through the
//! same dispatch path as real protocol traffic.
//!
//! # Reference
//! - RFC 2812 Section 3: Message Details

/// Server liveness probe.
pub const PING: &str = "PING";

/// Reply to a [`PING`].
pub const PONG: &str = "PONG";

/// Set or change the client nickname.
pub const NICK: &str = "NICK";

/// Register username and realname after connecting.
pub const USER: &str = "USER";

/// Terminate the session.
pub const QUIT: &str = "QUIT";

/// Message to a channel or user.
pub const PRIVMSG: &str = "PRIVMSG";

/// ERR_NICKNAMEINUSE numeric: the requested nickname is already taken.
pub const ERR_NICKNAMEINUSE: &str = "433";

/// Pseudo-event synthesized when the transport is established.
///
/// Not a real protocol line; filter on this to observe connection
/// establishment.
pub const CONNECTED: &str = "connected";

/// Pseudo-event synthesized when the session is torn down.
pub const DISCONNECTED: &str = "disconnected";
