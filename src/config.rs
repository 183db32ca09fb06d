//! Client configuration.

use serde::Deserialize;

/// Configuration for a [`Client`].
///
/// Deserializable so it can be embedded in an application's own config
/// layer, with builder-style setters for programmatic construction.
///
/// [`Client`]: crate::Client
#[derive(Clone, Debug, Deserialize)]
pub struct ClientConfig {
    /// Nickname requested on connect. May change during the session if the
    /// server reports a collision.
    pub nickname: String,

    /// Ident (username) sent in the `USER` registration.
    pub ident: String,

    /// Server address in `host:port` form.
    pub server: String,

    /// Connect over TLS.
    #[serde(default)]
    pub tls: bool,

    /// Verify the server certificate against the system root store.
    /// Disable only for servers with self-signed certificates.
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Seed for the nickname-collision suffix generator. Fixing the seed
    /// makes collision recovery reproducible.
    #[serde(default)]
    pub nick_seed: Option<u64>,
}

fn default_tls_verify() -> bool {
    true
}

impl ClientConfig {
    /// Plain-TCP configuration for `server` with the given identity.
    pub fn new(
        nickname: impl Into<String>,
        ident: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        Self {
            nickname: nickname.into(),
            ident: ident.into(),
            server: server.into(),
            tls: false,
            tls_verify: true,
            nick_seed: None,
        }
    }

    /// Enable TLS with the given verification policy.
    pub fn with_tls(mut self, verify: bool) -> Self {
        self.tls = true;
        self.tls_verify = verify;
        self
    }

    /// Fix the nickname-suffix seed.
    pub fn with_nick_seed(mut self, seed: u64) -> Self {
        self.nick_seed = Some(seed);
        self
    }
}
