//! WebTransport server implementation
//!
//! Each accepted session opens one bidirectional stream. The read half feeds
//! decoded messages into the session channel; the write half drains the
//! connection's outbox. Connection tasks never touch game state.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{channel, Receiver, UnboundedSender};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::game::constants::net::OUTBOX_CAPACITY;
use crate::metrics::Metrics;
use crate::net::broadcast::{ConnectionId, Payload};
use crate::net::framing::{read_message, write_message, FramingError};
use crate::net::game_session::SessionEvent;
use crate::net::limits::{ConnectionLimitError, ConnectionLimiter, MessageRateLimit};
use crate::net::protocol::{decode, ClientMessage};
use crate::net::tls::TlsConfig;

/// WebTransport server
pub struct WebTransportServer {
    config: ServerConfig,
    tls_config: TlsConfig,
    limiter: Arc<ConnectionLimiter>,
    events: UnboundedSender<SessionEvent>,
    metrics: Arc<Metrics>,
}

impl WebTransportServer {
    /// Create a new WebTransport server feeding `events`
    pub async fn new(
        config: ServerConfig,
        events: UnboundedSender<SessionEvent>,
        metrics: Arc<Metrics>,
    ) -> anyhow::Result<Self> {
        let tls_config = TlsConfig::load(&config).await?;
        let limiter = Arc::new(ConnectionLimiter::new(config.limits()));

        Ok(Self {
            config,
            tls_config,
            limiter,
            events,
            metrics,
        })
    }

    /// Get the certificate hash for client configuration
    pub fn cert_hash(&self) -> &str {
        self.tls_config.cert_hash()
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.config.bind_address, self.config.port)
    }

    /// Run the accept loop
    pub async fn run(self) -> anyhow::Result<()> {
        use wtransport::Endpoint;
        use wtransport::ServerConfig;

        let bind_addr = self.bind_addr();

        // Unspecified address binds dual-stack (IPv4 + IPv6)
        let builder = if self.config.bind_address.is_unspecified() {
            ServerConfig::builder().with_bind_default(self.config.port)
        } else {
            ServerConfig::builder().with_bind_address(bind_addr)
        };
        let server_config = builder.with_identity(self.tls_config.identity).build();

        let server = Endpoint::server(server_config)?;

        info!("WebTransport server listening on {}", bind_addr);

        loop {
            let incoming = server.accept().await;

            let limiter = self.limiter.clone();
            let events = self.events.clone();
            let metrics = self.metrics.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(incoming, limiter, events, metrics).await {
                    warn!("Connection error: {}", e);
                }
            });
        }
    }
}

/// Handle a single WebTransport connection
async fn handle_connection(
    incoming: wtransport::endpoint::IncomingSession,
    limiter: Arc<ConnectionLimiter>,
    events: UnboundedSender<SessionEvent>,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let session_request = incoming.await?;

    // Slot is held until this function returns
    let _permit = match limiter.try_acquire() {
        Ok(permit) => permit,
        Err(e) => {
            Metrics::incr(&metrics.connections_rejected);
            return Err(anyhow!("Connection rejected: {}", e));
        }
    };

    let conn_id: ConnectionId = Uuid::new_v4();
    debug!(
        "New connection from: {:?}, path: {}, conn_id: {}",
        session_request.authority(),
        session_request.path(),
        conn_id
    );

    let connection = session_request.accept().await?;
    let (send, mut recv) = connection.accept_bi().await?;

    let (outbox_tx, outbox_rx) = channel(OUTBOX_CAPACITY);
    events
        .send(SessionEvent::Connected {
            conn_id,
            outbox: outbox_tx,
        })
        .map_err(|_| anyhow!("Session closed"))?;

    Metrics::incr(&metrics.connections_active);
    Metrics::incr(&metrics.connections_total);

    let writer = tokio::spawn(write_loop(send, outbox_rx, conn_id, metrics.clone()));

    let result = tokio::select! {
        result = read_loop(&mut recv, conn_id, &events, limiter.message_limiter(), &metrics) => result,
        reason = connection.closed() => {
            debug!("Connection {} closed: {}", conn_id, reason);
            Ok(())
        }
    };

    // Actor unregisters the outbox; the writer ends once it is dropped
    if events.send(SessionEvent::Disconnected { conn_id }).is_err() {
        writer.abort();
    }
    Metrics::decr(&metrics.connections_active);

    debug!("Connection closed (conn_id: {})", conn_id);
    result
}

/// Read frames until the stream ends, forwarding decoded messages
///
/// Undecodable and rate-limited frames are skipped; oversized frames and
/// repeated rate violations end the connection.
pub async fn read_loop<R: AsyncRead + Unpin>(
    recv: &mut R,
    conn_id: ConnectionId,
    events: &UnboundedSender<SessionEvent>,
    mut rate: MessageRateLimit,
    metrics: &Metrics,
) -> anyhow::Result<()> {
    let mut buffer = Vec::with_capacity(4096);

    loop {
        match read_message(recv, &mut buffer).await {
            Ok(()) => {}
            Err(FramingError::ConnectionClosed) => {
                debug!("Stream from {} ended", conn_id);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        metrics
            .bytes_received
            .fetch_add(buffer.len() as u64, Ordering::Relaxed);

        match rate.check() {
            Ok(()) => {}
            Err(ConnectionLimitError::RateLimitExceeded) => {
                debug!("Rate limit exceeded for conn_id: {}", conn_id);
                Metrics::incr(&metrics.messages_dropped);
                continue;
            }
            Err(e) => {
                warn!("Disconnecting conn_id {}: {}", conn_id, e);
                return Err(e.into());
            }
        }

        let message: ClientMessage = match decode(&buffer) {
            Ok(message) => message,
            Err(e) => {
                debug!("Failed to decode message from {}: {}", conn_id, e);
                Metrics::incr(&metrics.messages_dropped);
                continue;
            }
        };

        Metrics::incr(&metrics.messages_received);
        if events
            .send(SessionEvent::Message { conn_id, message })
            .is_err()
        {
            return Err(anyhow!("Session closed"));
        }
    }
}

/// Drain a connection's outbox onto its send stream
///
/// While a write is blocked by flow control the outbox fills up to its
/// capacity and the broadcaster drops further messages for this connection.
pub async fn write_loop<W: AsyncWrite + Unpin>(
    mut send: W,
    mut outbox: Receiver<Payload>,
    conn_id: ConnectionId,
    metrics: Arc<Metrics>,
) {
    while let Some(payload) = outbox.recv().await {
        if let Err(e) = write_message(&mut send, &payload).await {
            debug!("Write to {} failed: {}", conn_id, e);
            break;
        }
        metrics
            .bytes_sent
            .fetch_add(payload.len() as u64, Ordering::Relaxed);
    }
}
