//! Connection protection
//!
//! Caps concurrent connections and rate-limits inbound messages per
//! connection in fixed windows. A connection that overruns its budget in
//! too many windows is closed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Limits applied to every connection
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Maximum concurrent connections
    pub max_connections: usize,
    /// Messages allowed per window per connection
    pub max_messages_per_window: u32,
    /// Length of a rate limiting window
    pub window: Duration,
    /// Windows with overruns before the connection is closed
    pub violations_before_close: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: 64,
            max_messages_per_window: 60,
            window: Duration::from_secs(1),
            violations_before_close: 10,
        }
    }
}

/// Errors from connection protection checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionLimitError {
    #[error("Too many connections (max {0})")]
    TooManyConnections(usize),
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("Too many violations, connection terminated")]
    ViolationLimitExceeded,
}

/// Shared connection counter
#[derive(Debug)]
pub struct ConnectionLimiter {
    config: LimitsConfig,
    active: Arc<AtomicUsize>,
}

impl ConnectionLimiter {
    pub fn new(config: LimitsConfig) -> Self {
        Self {
            config,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Reserve a connection slot; it is released when the permit drops
    pub fn try_acquire(&self) -> Result<ConnectionPermit, ConnectionLimitError> {
        let max = self.config.max_connections;
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .map_err(|_| ConnectionLimitError::TooManyConnections(max))?;

        Ok(ConnectionPermit {
            active: self.active.clone(),
        })
    }

    /// Fresh message limiter for a newly accepted connection
    pub fn message_limiter(&self) -> MessageRateLimit {
        MessageRateLimit::new(
            self.config.max_messages_per_window,
            self.config.window,
            self.config.violations_before_close,
        )
    }

    pub fn connection_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

impl Default for ConnectionLimiter {
    fn default() -> Self {
        Self::new(LimitsConfig::default())
    }
}

/// An occupied connection slot
#[derive(Debug)]
pub struct ConnectionPermit {
    active: Arc<AtomicUsize>,
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Fixed-window message counter owned by one connection task
#[derive(Debug)]
pub struct MessageRateLimit {
    max_per_window: u32,
    window: Duration,
    violations_before_close: u32,
    window_start: Option<Instant>,
    message_count: u32,
    violated_this_window: bool,
    violations: u32,
}

impl MessageRateLimit {
    pub fn new(max_per_window: u32, window: Duration, violations_before_close: u32) -> Self {
        Self {
            max_per_window,
            window,
            violations_before_close,
            window_start: None,
            message_count: 0,
            violated_this_window: false,
            violations: 0,
        }
    }

    pub fn check(&mut self) -> Result<(), ConnectionLimitError> {
        self.check_at(Instant::now())
    }

    /// Count one message received at `now`
    ///
    /// `RateLimitExceeded` means drop the message; `ViolationLimitExceeded`
    /// means close the connection.
    pub fn check_at(&mut self, now: Instant) -> Result<(), ConnectionLimitError> {
        if self.violations >= self.violations_before_close {
            return Err(ConnectionLimitError::ViolationLimitExceeded);
        }

        let expired = self
            .window_start
            .map_or(true, |start| now.saturating_duration_since(start) >= self.window);
        if expired {
            self.window_start = Some(now);
            self.message_count = 0;
            self.violated_this_window = false;
        }

        self.message_count += 1;
        if self.message_count <= self.max_per_window {
            return Ok(());
        }

        // One violation per window, however far over the budget
        if !self.violated_this_window {
            self.violated_this_window = true;
            self.violations += 1;
            if self.violations >= self.violations_before_close {
                return Err(ConnectionLimitError::ViolationLimitExceeded);
            }
        }
        Err(ConnectionLimitError::RateLimitExceeded)
    }

    pub fn violation_count(&self) -> u32 {
        self.violations
    }
}
