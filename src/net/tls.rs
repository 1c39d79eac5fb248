use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ring::digest::{digest, SHA256};
use std::path::Path;
use tracing::info;
use wtransport::Identity;

use crate::config::ServerConfig;

// Dev certificate paths (generated by scripts/gen-dev-cert)
const DEV_CERT_FILE: &str = "certs/cert.pem";
const DEV_KEY_FILE: &str = "certs/key.pem";

/// TLS configuration for WebTransport server
pub struct TlsConfig {
    /// The wtransport Identity containing certificate and key
    pub identity: Identity,
    /// Base64-encoded SHA-256 hash of the certificate (for browser flag)
    pub cert_hash: String,
}

impl TlsConfig {
    /// Load TLS configuration
    ///
    /// Production: set TLS_CERT_PATH and TLS_KEY_PATH
    /// Development: run the dev-cert generator first to populate certs/
    pub async fn load(config: &ServerConfig) -> Result<Self> {
        if let (Some(cert_path), Some(key_path)) = (&config.tls_cert_path, &config.tls_key_path) {
            info!("Loading TLS certificate from configured paths");
            return Self::load_from_paths(cert_path, key_path).await;
        }

        if Path::new(DEV_CERT_FILE).exists() && Path::new(DEV_KEY_FILE).exists() {
            info!("Loading dev certificate from certs/");
            Self::load_from_paths(DEV_CERT_FILE, DEV_KEY_FILE).await
        } else {
            Err(anyhow!(
                "TLS certificate not found.\n\n\
                For development: run `cargo run --manifest-path scripts/Cargo.toml` to generate certs/.\n\
                For production: Set TLS_CERT_PATH and TLS_KEY_PATH environment variables."
            ))
        }
    }

    /// Load certificate from PEM file paths
    async fn load_from_paths(cert_path: &str, key_path: &str) -> Result<Self> {
        let identity = Identity::load_pemfiles(cert_path, key_path)
            .await
            .with_context(|| format!("Failed to load certificate from {}", cert_path))?;

        let cert_hash = Self::compute_cert_hash(&identity);
        info!("Certificate hash: {}", cert_hash);

        Ok(Self {
            identity,
            cert_hash,
        })
    }

    fn compute_cert_hash(identity: &Identity) -> String {
        identity
            .certificate_chain()
            .as_slice()
            .first()
            .map(|cert| {
                let hash = digest(&SHA256, cert.der());
                STANDARD.encode(hash.as_ref())
            })
            .unwrap_or_default()
    }

    /// Get the certificate hash for client configuration
    pub fn cert_hash(&self) -> &str {
        &self.cert_hash
    }
}
