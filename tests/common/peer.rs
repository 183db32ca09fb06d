//! In-memory server peer for integration tests.

use std::sync::Arc;
use std::time::Duration;

use slirc_client::{Client, ClientConfig, ClientError, Transport};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

/// Ceiling for any single peer read in tests.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// The server side of an in-memory connection.
pub struct Peer {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl Peer {
    /// Next line written by the client, framing stripped.
    pub async fn recv_line(&mut self) -> String {
        self.try_recv_line()
            .await
            .expect("peer stream closed while expecting a line")
    }

    /// Next line, or `None` once the client closes the connection.
    pub async fn try_recv_line(&mut self) -> Option<String> {
        tokio::time::timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for a client line")
            .expect("peer read failed")
    }

    /// Send one server line to the client.
    pub async fn send_line(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("peer write failed");
    }

    /// Send raw bytes to the client, framing included.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("peer write failed");
    }
}

/// Attach `client` to an in-memory peer and start its event loop.
pub fn start(client: Arc<Client>) -> (JoinHandle<Result<(), ClientError>>, Peer) {
    let (near, far) = tokio::io::duplex(4096);
    client.attach(Transport::memory(near));
    let run = tokio::spawn(async move { client.run().await });

    let (read, writer) = tokio::io::split(far);
    let peer = Peer {
        lines: BufReader::new(read).lines(),
        writer,
    };
    (run, peer)
}

/// Client configuration used across the integration tests. The fixed seed
/// makes nickname-collision recovery deterministic.
pub fn test_config() -> ClientConfig {
    ClientConfig::new("testbot", "ident", "irc.example.org:6667").with_nick_seed(42)
}
