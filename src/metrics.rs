//! Prometheus-compatible metrics endpoint
//!
//! Counters are plain atomics updated from the session actor and the
//! connection tasks. The HTTP endpoint is compiled with the `metrics`
//! feature; default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Samples kept for event-handling percentiles
const HISTORY_LEN: usize = 1000;

/// Metrics registry for the arena server
#[derive(Debug)]
pub struct Metrics {
    // Connections and players
    pub connections_active: AtomicU64,
    pub connections_total: AtomicU64,
    pub connections_rejected: AtomicU64,
    pub players_active: AtomicU64,
    pub players_alive: AtomicU64,

    // Network traffic
    pub messages_received: AtomicU64,
    pub messages_sent: AtomicU64,
    pub messages_dropped: AtomicU64,
    pub bytes_received: AtomicU64,
    pub bytes_sent: AtomicU64,

    // Combat
    pub shots_resolved: AtomicU64,
    pub hits: AtomicU64,
    pub kills: AtomicU64,
    pub respawns: AtomicU64,

    // Session event handling time (microseconds)
    pub event_time_us: AtomicU64,
    pub event_time_p95_us: AtomicU64,
    pub event_time_p99_us: AtomicU64,
    pub event_time_max_us: AtomicU64,
    pub events_handled: AtomicU64,

    start_time: Instant,

    // Rolling samples for percentile calculation
    event_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            connections_rejected: AtomicU64::new(0),
            players_active: AtomicU64::new(0),
            players_alive: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            shots_resolved: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            kills: AtomicU64::new(0),
            respawns: AtomicU64::new(0),
            event_time_us: AtomicU64::new(0),
            event_time_p95_us: AtomicU64::new(0),
            event_time_p99_us: AtomicU64::new(0),
            event_time_max_us: AtomicU64::new(0),
            events_handled: AtomicU64::new(0),
            start_time: Instant::now(),
            event_history: RwLock::new(VecDeque::with_capacity(HISTORY_LEN)),
        }
    }

    #[inline]
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn decr(counter: &AtomicU64) {
        // Never wraps below zero
        let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }

    /// Record how long one session event took to handle
    pub fn record_event_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.event_time_us.store(us, Ordering::Relaxed);
        self.events_handled.fetch_add(1, Ordering::Relaxed);

        let mut history = self.event_history.write();
        history.push_back(us);
        while history.len() > HISTORY_LEN {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.event_time_p95_us
                .store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.event_time_p99_us
                .store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.event_time_max_us
                .store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("arena_connections_active", "Open WebTransport connections", "gauge",
            self.connections_active.load(Ordering::Relaxed));
        metric!("arena_connections_total", "Connections accepted since start", "counter",
            self.connections_total.load(Ordering::Relaxed));
        metric!("arena_connections_rejected_total", "Connections refused at capacity", "counter",
            self.connections_rejected.load(Ordering::Relaxed));
        metric!("arena_players_active", "Joined players", "gauge",
            self.players_active.load(Ordering::Relaxed));
        metric!("arena_players_alive", "Joined players with health above zero", "gauge",
            self.players_alive.load(Ordering::Relaxed));

        metric!("arena_messages_received_total", "Client messages decoded", "counter",
            self.messages_received.load(Ordering::Relaxed));
        metric!("arena_messages_sent_total", "Server messages queued to connections", "counter",
            self.messages_sent.load(Ordering::Relaxed));
        metric!("arena_messages_dropped_total", "Client messages rejected or rate limited", "counter",
            self.messages_dropped.load(Ordering::Relaxed));
        metric!("arena_bytes_received_total", "Payload bytes received", "counter",
            self.bytes_received.load(Ordering::Relaxed));
        metric!("arena_bytes_sent_total", "Payload bytes sent", "counter",
            self.bytes_sent.load(Ordering::Relaxed));

        metric!("arena_shots_total", "Shots resolved", "counter",
            self.shots_resolved.load(Ordering::Relaxed));
        metric!("arena_hits_total", "Shots that damaged a player", "counter",
            self.hits.load(Ordering::Relaxed));
        metric!("arena_kills_total", "Players killed", "counter",
            self.kills.load(Ordering::Relaxed));
        metric!("arena_respawns_total", "Players respawned", "counter",
            self.respawns.load(Ordering::Relaxed));

        metric!("arena_event_time_microseconds", "Last session event handling time", "gauge",
            self.event_time_us.load(Ordering::Relaxed));
        metric!("arena_event_time_p95_microseconds", "95th percentile event handling time", "gauge",
            self.event_time_p95_us.load(Ordering::Relaxed));
        metric!("arena_event_time_p99_microseconds", "99th percentile event handling time", "gauge",
            self.event_time_p99_us.load(Ordering::Relaxed));
        metric!("arena_event_time_max_microseconds", "Maximum event handling time", "gauge",
            self.event_time_max_us.load(Ordering::Relaxed));
        metric!("arena_events_total", "Session events handled", "counter",
            self.events_handled.load(Ordering::Relaxed));
        metric!("arena_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the metrics HTTP server
#[cfg(feature = "metrics")]
pub async fn start_metrics_server(
    metrics: std::sync::Arc<Metrics>,
    port: u16,
) -> anyhow::Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tracing::{debug, info};

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);
                    let response = http_response(&metrics, &request);

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}

/// Build the full HTTP response for a raw request
#[cfg(feature = "metrics")]
fn http_response(metrics: &Metrics, request: &str) -> String {
    let path = request
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("GET "))
        .and_then(|rest| rest.split_whitespace().next());

    let (status, content_type, body) = match path {
        Some("/metrics") => ("200 OK", "text/plain; version=0.0.4", metrics.to_prometheus()),
        Some("/health") | Some("/") => ("200 OK", "text/plain", "OK".to_string()),
        _ => ("404 Not Found", "text/plain", String::new()),
    };

    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    )
}
