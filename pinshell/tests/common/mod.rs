//! Shared helpers for the session end-to-end tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pinshell::tls::build_client_config;
use pinshell::{Responder, SessionStats, ShellSpec};
use pinshell_auth::Fingerprint;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

/// Upper bound for every network wait in these tests.
pub const WAIT: Duration = Duration::from_secs(10);

/// `/bin/sh -c <script>` as the per-session interpreter.
pub fn stub_shell(script: &str) -> ShellSpec {
    ShellSpec::new("/bin/sh").arg("-c").arg(script)
}

/// A responder serving in the background on an ephemeral loopback port.
pub struct RunningResponder {
    pub addr: SocketAddr,
    pub fingerprint: Fingerprint,
    pub stats: Arc<SessionStats>,
    task: tokio::task::JoinHandle<()>,
}

impl RunningResponder {
    pub async fn start(shell: ShellSpec) -> Self {
        let responder = Responder::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind responder");

        let addr = responder.local_addr().expect("Listener has no address");
        let fingerprint = responder.fingerprint().clone();
        let stats = responder.stats();
        let task = tokio::spawn(responder.serve(shell));

        Self {
            addr,
            fingerprint,
            stats,
            task,
        }
    }
}

impl Drop for RunningResponder {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Connect with a client that accepts whatever certificate the server shows.
pub async fn connect_any(addr: SocketAddr) -> TlsStream<TcpStream> {
    let config = build_client_config().expect("Failed to build client config");
    let connector = TlsConnector::from(config);

    let tcp = tokio::time::timeout(WAIT, TcpStream::connect(addr))
        .await
        .expect("TCP connect timed out")
        .expect("TCP connect failed");

    let server_name = ServerName::try_from("localhost").expect("Invalid server name");
    tokio::time::timeout(WAIT, connector.connect(server_name, tcp))
        .await
        .expect("TLS handshake timed out")
        .expect("TLS handshake failed")
}

/// Read until `needle` shows up, returning everything read so far.
///
/// Panics on timeout or if the stream ends first.
pub async fn read_until<R: AsyncRead + Unpin>(reader: &mut R, needle: &str) -> String {
    let mut received = Vec::new();
    let mut buf = [0u8; 1024];

    tokio::time::timeout(WAIT, async {
        loop {
            if String::from_utf8_lossy(&received).contains(needle) {
                break;
            }
            let n = reader.read(&mut buf).await.expect("Read failed");
            assert!(
                n > 0,
                "Stream ended before {needle:?}, got {:?}",
                String::from_utf8_lossy(&received)
            );
            received.extend_from_slice(&buf[..n]);
        }
    })
    .await
    .expect("Timed out waiting for output");

    String::from_utf8_lossy(&received).into_owned()
}

/// Drain the stream to EOF or error, with a timeout.
pub async fn read_to_close<R: AsyncRead + Unpin>(reader: &mut R) -> Vec<u8> {
    let mut received = Vec::new();
    let _ = tokio::time::timeout(WAIT, reader.read_to_end(&mut received))
        .await
        .expect("Stream was not closed");
    received
}
