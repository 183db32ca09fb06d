//! Client transport: dialing and line framing.
//!
//! The transport owns the raw connection (TCP, client-side TLS, or an
//! in-memory duplex pipe for tests and local loopback) and frames it with
//! the [`LineCodec`]. Dialing applies a fixed ceiling; TLS verification
//! policy follows the client configuration.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream as ClientTlsStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{
    ClientConfig as TlsClientConfig, DigitallySignedStruct, Error as TlsError, RootCertStore,
    SignatureScheme,
};
use tokio_rustls::TlsConnector;
use tokio_util::codec::Framed;
use tracing::{info, warn};

use crate::error::ConnectError;
use crate::line::LineCodec;

/// Fixed ceiling for connection establishment, TLS handshake included.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// The raw stream under a [`Transport`].
#[non_exhaustive]
pub enum TransportStream {
    /// Plain TCP stream.
    Tcp(TcpStream),
    /// Client-side TLS stream (boxed for size).
    Tls(Box<ClientTlsStream<TcpStream>>),
    /// In-memory duplex pipe, for tests and local peers.
    Memory(DuplexStream),
}

impl AsyncRead for TransportStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(inner) => Pin::new(inner).poll_read(cx, buf),
            Self::Tls(inner) => Pin::new(inner).poll_read(cx, buf),
            Self::Memory(inner) => Pin::new(inner).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for TransportStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Self::Tcp(inner) => Pin::new(inner).poll_write(cx, buf),
            Self::Tls(inner) => Pin::new(inner).poll_write(cx, buf),
            Self::Memory(inner) => Pin::new(inner).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(inner) => Pin::new(inner).poll_flush(cx),
            Self::Tls(inner) => Pin::new(inner).poll_flush(cx),
            Self::Memory(inner) => Pin::new(inner).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(inner) => Pin::new(inner).poll_shutdown(cx),
            Self::Tls(inner) => Pin::new(inner).poll_shutdown(cx),
            Self::Memory(inner) => Pin::new(inner).poll_shutdown(cx),
        }
    }
}

/// An established, line-framed connection to a server.
pub struct Transport {
    stream: TransportStream,
}

impl Transport {
    /// Dial `server` (`host:port` form) within `timeout`.
    ///
    /// With `use_tls` the TCP stream is upgraded to client-side TLS;
    /// `verify_tls` selects between the system root store and a
    /// verifier that accepts any certificate (self-signed servers).
    ///
    /// # Errors
    ///
    /// [`ConnectError::Timeout`] if the ceiling elapses, otherwise the
    /// underlying dial or handshake failure. No retries are performed.
    pub async fn dial(
        server: &str,
        use_tls: bool,
        verify_tls: bool,
        timeout: Duration,
    ) -> Result<Self, ConnectError> {
        match tokio::time::timeout(timeout, Self::dial_inner(server, use_tls, verify_tls)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectError::Timeout(timeout)),
        }
    }

    async fn dial_inner(
        server: &str,
        use_tls: bool,
        verify_tls: bool,
    ) -> Result<Self, ConnectError> {
        let tcp = TcpStream::connect(server).await?;

        if !use_tls {
            info!(server, "connected");
            return Ok(Self {
                stream: TransportStream::Tcp(tcp),
            });
        }

        let host = server.rsplit_once(':').map_or(server, |(host, _)| host);
        let config = tls_config(verify_tls);
        let connector = TlsConnector::from(Arc::new(config));
        let server_name = ServerName::try_from(host.to_owned())
            .map_err(|_| ConnectError::InvalidServerName(host.to_owned()))?;

        let tls = connector.connect(server_name, tcp).await?;
        info!(server, verify = verify_tls, "TLS handshake completed");

        Ok(Self {
            stream: TransportStream::Tls(Box::new(tls)),
        })
    }

    /// Wrap an in-memory duplex stream.
    ///
    /// Used by tests and local peers to drive the full client pipeline
    /// without a socket.
    pub fn memory(stream: DuplexStream) -> Self {
        Self {
            stream: TransportStream::Memory(stream),
        }
    }

    /// Whether this transport is TLS-encrypted.
    pub fn is_tls(&self) -> bool {
        matches!(self.stream, TransportStream::Tls(_))
    }

    pub(crate) fn into_framed(self) -> Framed<TransportStream, LineCodec> {
        Framed::new(self.stream, LineCodec::new())
    }
}

fn tls_config(verify_tls: bool) -> TlsClientConfig {
    if verify_tls {
        let mut roots = RootCertStore::empty();
        let certs = rustls_native_certs::load_native_certs();
        for cert in certs.certs {
            if let Err(e) = roots.add(cert) {
                warn!(error = %e, "failed to add root cert");
            }
        }
        for e in &certs.errors {
            warn!(error = %e, "error loading native certs");
        }
        TlsClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth()
    } else {
        // Dangerous: skip certificate verification (self-signed certs only)
        TlsClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousNoVerifier))
            .with_no_client_auth()
    }
}

/// Certificate verifier that accepts any server certificate.
#[derive(Debug)]
struct DangerousNoVerifier;

impl ServerCertVerifier for DangerousNoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        tokio_rustls::rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
