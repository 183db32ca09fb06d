//! # slirc-client
//!
//! A Tokio-based IRC client library for building bots and other tools on
//! the RFC 2812 wire protocol.
//!
//! ## Features
//!
//! - Line decoding into structured [`Event`]s (prefix, command, parameters)
//! - Composable [`Filter`]s: exact-command, channel-target, regex-over-field,
//!   and an AND combinator
//! - Append-only handler registration with per-event concurrent dispatch
//! - Built-in PING/PONG keep-alive, post-connect authentication, and
//!   nickname-collision recovery
//! - TCP and client-side TLS transports with a fixed dial ceiling
//!
//! ## Quick Start
//!
//! ```no_run
//! use slirc_client::{Client, ClientConfig, Filter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientConfig::new(
//!         "mybot",
//!         "mybot",
//!         "irc.libera.chat:6667",
//!     ));
//!
//!     client.handle(vec![Filter::command("PRIVMSG")], |event, _ctx| async move {
//!         println!("<{}> {}", event.prefix, event.params.join(" "));
//!         Ok(())
//!     });
//!
//!     client.connect().await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! Transport reads are decoded into events and handed off through an
//! unbounded queue; every queued event is dispatched on its own task, so a
//! slow handler never stalls decoding and a PING reply never waits behind
//! the registration grace period. Outgoing writes from any number of
//! handler tasks are serialized by a single writer task that owns the
//! transport write half.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod client;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod filter;
pub mod line;
pub mod state;
pub mod transport;

pub use self::client::{Client, NICK_GRACE, NICK_MAX_LEN};
pub use self::config::ClientConfig;
pub use self::dispatch::{Context, HandlerFn, HandlerFuture};
pub use self::error::{
    ClientError, ConnectError, DecodeError, HandlerError, TransportError, WireError,
};
pub use self::event::Event;
pub use self::filter::{Filter, RegexField};
pub use self::line::{LineCodec, MAX_LINE_LEN};
pub use self::state::ConnectionState;
pub use self::transport::{Transport, TransportStream, CONNECT_TIMEOUT};
