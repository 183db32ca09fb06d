//! Connection lifecycle states.

/// Where the session is in its lifecycle.
///
/// Driven entirely by events: the built-in handlers move the session
/// forward in reaction to the `connected` pseudo-event and the
/// authentication flow, and back to [`Disconnected`] on teardown.
///
/// [`Disconnected`]: ConnectionState::Disconnected
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport.
    #[default]
    Disconnected,
    /// Dial in progress.
    Connecting,
    /// Transport established, registration not yet started.
    Connected,
    /// NICK/USER registration in flight.
    Authenticating,
    /// Registration sent; session in steady state.
    Ready,
}

impl ConnectionState {
    /// Whether a transport is currently attached.
    pub fn is_connected(&self) -> bool {
        !matches!(self, Self::Disconnected | Self::Connecting)
    }
}
