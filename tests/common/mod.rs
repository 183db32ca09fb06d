//! Integration test common infrastructure.
//!
//! Provides an in-memory server peer that drives the client over a duplex
//! pipe, so the full pipeline (framing, decode, dispatch, built-ins,
//! writer task) runs without a socket.

pub mod peer;

#[allow(unused_imports)]
pub use peer::{start, test_config, Peer};
