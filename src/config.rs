use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use crate::net::limits::LimitsConfig;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Inbound messages allowed per second per connection
    pub max_messages_per_second: u32,
    /// Path to TLS certificate file (falls back to certs/)
    pub tls_cert_path: Option<String>,
    /// Path to TLS key file (falls back to certs/)
    pub tls_key_path: Option<String>,
    /// Seed for spawn and color randomness; random when unset
    pub rng_seed: Option<u64>,
    /// Port of the Prometheus endpoint
    pub metrics_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 4433,
            max_connections: 64,
            max_messages_per_second: 60,
            tls_cert_path: None,
            tls_key_path: None,
            rng_seed: None,
            metrics_port: 9090,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse_var::<IpAddr, _>(&lookup, "BIND_ADDRESS") {
            config.bind_address = addr;
        }

        if let Some(port) = parse_var::<u16, _>(&lookup, "PORT") {
            if port > 0 {
                config.port = port;
            } else {
                tracing::warn!("PORT must be > 0, using default");
            }
        }

        if let Some(max) = parse_var::<usize, _>(&lookup, "MAX_CONNECTIONS") {
            if max > 0 && max <= 10000 {
                config.max_connections = max;
            } else {
                tracing::warn!("MAX_CONNECTIONS must be 1-10000, using default");
            }
        }

        if let Some(rate) = parse_var::<u32, _>(&lookup, "MAX_MESSAGES_PER_SECOND") {
            if rate > 0 {
                config.max_messages_per_second = rate;
            } else {
                tracing::warn!("MAX_MESSAGES_PER_SECOND must be > 0, using default");
            }
        }

        config.tls_cert_path = lookup("TLS_CERT_PATH");
        config.tls_key_path = lookup("TLS_KEY_PATH");
        config.rng_seed = parse_var::<u64, _>(&lookup, "RNG_SEED");

        if let Some(port) = parse_var::<u16, _>(&lookup, "METRICS_PORT") {
            config.metrics_port = port;
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }
        if self.max_connections == 0 {
            return Err("max_connections must be at least 1".to_string());
        }
        if self.max_messages_per_second == 0 {
            return Err("max_messages_per_second must be at least 1".to_string());
        }
        if self.tls_cert_path.is_some() != self.tls_key_path.is_some() {
            return Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string());
        }
        if self.metrics_port == self.port {
            return Err("metrics_port cannot equal the game port".to_string());
        }
        Ok(())
    }

    /// Connection protection limits derived from this config
    pub fn limits(&self) -> LimitsConfig {
        LimitsConfig {
            max_connections: self.max_connections,
            max_messages_per_window: self.max_messages_per_second,
            window: Duration::from_secs(1),
            ..LimitsConfig::default()
        }
    }
}

/// Parse one variable, warning and returning `None` on bad input
fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 4433);
        assert_eq!(config.max_connections, 64);
        assert_eq!(config.max_messages_per_second, 60);
        assert_eq!(config.metrics_port, 9090);
        assert!(config.rng_seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = ServerConfig::load_or_default();
        assert!(config.port > 0);
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("BIND_ADDRESS", "127.0.0.1"),
            ("PORT", "5000"),
            ("MAX_CONNECTIONS", "8"),
            ("RNG_SEED", "1234"),
            ("METRICS_PORT", "9100"),
        ]);
        assert_eq!(config.bind_address, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.port, 5000);
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.rng_seed, Some(1234));
        assert_eq!(config.metrics_port, 9100);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_pairs(&[
            ("PORT", "0"),
            ("MAX_CONNECTIONS", "lots"),
            ("MAX_MESSAGES_PER_SECOND", "-1"),
            ("RNG_SEED", "abc"),
        ]);
        assert_eq!(config.port, 4433);
        assert_eq!(config.max_connections, 64);
        assert_eq!(config.max_messages_per_second, 60);
        assert!(config.rng_seed.is_none());
    }

    #[test]
    fn test_validate_tls_pair() {
        let config = from_pairs(&[("TLS_CERT_PATH", "cert.pem")]);
        assert!(config.validate().is_err());

        let config = from_pairs(&[("TLS_CERT_PATH", "cert.pem"), ("TLS_KEY_PATH", "key.pem")]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_port_clash() {
        let config = from_pairs(&[("PORT", "9090")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_limits() {
        let config = from_pairs(&[("MAX_MESSAGES_PER_SECOND", "30")]);
        let limits = config.limits();
        assert_eq!(limits.max_messages_per_window, 30);
        assert_eq!(limits.window, Duration::from_secs(1));
        assert_eq!(limits.violations_before_close, 10);
    }
}
