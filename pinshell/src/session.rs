//! Session establishment for the two connection roles.
//!
//! - [`Initiator`] dials out, skips chain validation, then pins the observed
//!   chain against the expected fingerprint.
//! - [`Responder`] listens with a freshly generated identity and accepts any
//!   peer. Each accepted connection gets its own detached task.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use pinshell_auth::{evaluate_chain, Fingerprint, PinDecision};
use rustls::pki_types::{CertificateDer, ServerName};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::{TlsAcceptor, TlsConnector, TlsStream};

use crate::error::ShellError;
use crate::shell::{self, ShellSpec};
use crate::tls::{self, ServerIdentity};

/// An established encrypted byte stream plus what the peer presented.
///
/// Dropping a session closes the underlying connection.
pub struct Session {
    stream: TlsStream<TcpStream>,
    peer_chain: Vec<CertificateDer<'static>>,
    peer_addr: Option<SocketAddr>,
}

impl Session {
    fn new(stream: TlsStream<TcpStream>, peer_addr: Option<SocketAddr>) -> Self {
        let (_, connection) = stream.get_ref();
        let peer_chain = connection
            .peer_certificates()
            .map(|certs| certs.to_vec())
            .unwrap_or_default();

        Self {
            stream,
            peer_chain,
            peer_addr,
        }
    }

    /// Certificates the peer presented during the handshake, in received order.
    pub fn peer_chain(&self) -> &[CertificateDer<'static>] {
        &self.peer_chain
    }

    /// Remote socket address, when known.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("peer_addr", &self.peer_addr)
            .field("peer_chain_len", &self.peer_chain.len())
            .finish()
    }
}

impl AsyncRead for Session {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for Session {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

/// The dialing role: connect out and pin the listener's certificate.
pub struct Initiator {
    connector: TlsConnector,
}

impl Initiator {
    /// Create an initiator with the chain-skipping client config.
    pub fn new() -> Result<Self, ShellError> {
        let config = tls::build_client_config().map_err(ShellError::ClientConfig)?;

        Ok(Self {
            connector: TlsConnector::from(config),
        })
    }

    /// Connect to `addr` and return the session only if its chain matches `pinned`.
    ///
    /// TCP or handshake failure is `HostUnreachable`; a chain without the pinned
    /// certificate is `FingerprintMismatch` and the connection is dropped.
    pub async fn dial(&self, addr: &str, pinned: &Fingerprint) -> Result<Session, ShellError> {
        let unreachable = |source: io::Error| ShellError::HostUnreachable {
            addr: addr.to_string(),
            source,
        };

        let tcp = TcpStream::connect(addr).await.map_err(unreachable)?;
        let peer_addr = tcp.peer_addr().ok();

        let tls_stream = self
            .connector
            .connect(server_name_for(addr), tcp)
            .await
            .map_err(unreachable)?;
        let session = Session::new(TlsStream::Client(tls_stream), peer_addr);

        match evaluate_chain(session.peer_chain(), pinned) {
            PinDecision::Trusted { index } => {
                tracing::debug!(addr, index, "Peer certificate matched pinned fingerprint");
                Ok(session)
            }
            PinDecision::Mismatch { presented } => {
                let presented = presented
                    .first()
                    .map(Fingerprint::to_string)
                    .unwrap_or_else(|| "no certificate".to_string());
                tracing::warn!(addr, presented = %presented, "Peer fingerprint mismatch");
                Err(ShellError::FingerprintMismatch {
                    addr: addr.to_string(),
                    presented,
                })
            }
            decision => {
                tracing::warn!(addr, ?decision, "Unrecognized pin decision");
                Err(ShellError::FingerprintMismatch {
                    addr: addr.to_string(),
                    presented: "unknown".to_string(),
                })
            }
        }
    }
}

/// TLS server name for a `host:port` target.
///
/// Chain validation is skipped, so the name only feeds SNI. Hosts that are not
/// valid names fall back to the unspecified address, which sends no SNI.
fn server_name_for(addr: &str) -> ServerName<'static> {
    let host = addr.rsplit_once(':').map_or(addr, |(host, _)| host);
    let host = host.trim_start_matches('[').trim_end_matches(']');

    ServerName::try_from(host.to_string())
        .unwrap_or_else(|_| ServerName::IpAddress(IpAddr::V4(Ipv4Addr::UNSPECIFIED).into()))
}

/// Best-effort bookkeeping of responder sessions.
///
/// Purely observational: nothing caps, joins or cancels sessions.
#[derive(Debug, Default)]
pub struct SessionStats {
    accepted: AtomicU64,
    active: AtomicUsize,
}

impl SessionStats {
    /// Connections accepted since the listener started.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Connections currently being handled.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    fn open(self: &Arc<Self>) -> ActiveSession {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
        ActiveSession(self.clone())
    }
}

/// Decrements the active count when a session task ends, on every path.
struct ActiveSession(Arc<SessionStats>);

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::Relaxed);
    }
}

/// The listening role: serve any peer with a fresh self-signed identity.
pub struct Responder {
    listener: TcpListener,
    acceptor: TlsAcceptor,
    identity: ServerIdentity,
    stats: Arc<SessionStats>,
}

impl Responder {
    /// Generate an identity and bind `addr`.
    pub async fn bind(addr: &str) -> Result<Self, ShellError> {
        let identity = tls::generate()?;
        let config = tls::build_server_config(&identity)?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ShellError::ListenFailed {
                addr: addr.to_string(),
                source,
            })?;

        let local_addr = listener.local_addr().ok();
        tracing::info!(
            addr = ?local_addr,
            fingerprint = %identity.fingerprint,
            "Listening for sessions"
        );

        Ok(Self {
            listener,
            acceptor: TlsAcceptor::from(config),
            identity,
            stats: Arc::new(SessionStats::default()),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Fingerprint initiators must pin to reach this listener.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.identity.fingerprint
    }

    /// The identity presented to every peer.
    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    /// Shared session counters.
    pub fn stats(&self) -> Arc<SessionStats> {
        self.stats.clone()
    }

    /// Accept connections forever, bridging each to its own interpreter.
    ///
    /// Accept errors are skipped without backoff. Handshake and interpreter
    /// failures end only the connection they happen on.
    pub async fn serve(self, shell: ShellSpec) {
        let shell = Arc::new(shell);

        loop {
            match self.listener.accept().await {
                Ok((tcp_stream, peer_addr)) => {
                    tracing::debug!(peer = %peer_addr, "TCP connection accepted");
                    tokio::spawn(handle_connection(
                        self.acceptor.clone(),
                        tcp_stream,
                        peer_addr,
                        shell.clone(),
                        self.stats.open(),
                    ));
                }
                Err(e) => {
                    tracing::debug!(error = %e, "TCP accept failed");
                }
            }
        }
    }
}

async fn handle_connection(
    acceptor: TlsAcceptor,
    tcp_stream: TcpStream,
    peer_addr: SocketAddr,
    shell: Arc<ShellSpec>,
    _active: ActiveSession,
) {
    let tls_stream = match acceptor.accept(tcp_stream).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::debug!(peer = %peer_addr, error = %e, "TLS handshake failed");
            return;
        }
    };
    tracing::debug!(peer = %peer_addr, "TLS handshake successful");

    let session = Session::new(TlsStream::Server(tls_stream), Some(peer_addr));
    match shell::pump(session, &shell).await {
        Ok(status) => tracing::debug!(peer = %peer_addr, ?status, "Session ended"),
        Err(e) => tracing::warn!(peer = %peer_addr, error = %e, "Session failed"),
    }
}
