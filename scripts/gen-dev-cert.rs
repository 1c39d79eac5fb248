//! Dev certificate generator - run from the repository root with
//! `cargo run --manifest-path scripts/Cargo.toml`
//!
//! Writes a short-lived self-signed certificate for localhost into certs/,
//! where the arena server looks when TLS_CERT_PATH/TLS_KEY_PATH are unset.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use ring::digest::{digest, SHA256};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

const CERT_DIR: &str = "certs";
const CERT_FILE: &str = "certs/cert.pem";
const KEY_FILE: &str = "certs/key.pem";

/// Browsers reject serverCertificateHashes for certs valid longer than 14 days
const VALIDITY: Duration = Duration::from_secs(14 * 24 * 60 * 60);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let force = std::env::args().any(|arg| arg == "--force");

    if !force && Path::new(CERT_FILE).exists() && Path::new(KEY_FILE).exists() {
        println!("Certificates already exist in {}/ (pass --force to regenerate)", CERT_DIR);
        print_hash()?;
        return Ok(());
    }

    println!("Generating development certificate for localhost...\n");
    fs::create_dir_all(CERT_DIR)?;

    let mut params = CertificateParams::new(vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
    ])?;

    params.distinguished_name = DistinguishedName::new();
    params
        .distinguished_name
        .push(DnType::CommonName, "Arena Server Dev");

    let now = SystemTime::now();
    params.not_before = now.into();
    params.not_after = (now + VALIDITY).into();

    let key_pair = KeyPair::generate()?;
    let cert = params.self_signed(&key_pair)?;

    fs::write(CERT_FILE, cert.pem())?;
    fs::write(KEY_FILE, key_pair.serialize_pem())?;

    println!("Certificate saved to {}", CERT_FILE);
    println!("Private key saved to {}\n", KEY_FILE);

    print_hash()
}

fn print_hash() -> Result<(), Box<dyn std::error::Error>> {
    let cert_pem = fs::read_to_string(CERT_FILE)?;
    let pem = pem::parse(&cert_pem)?;

    // Same value the server logs at startup
    let hash = digest(&SHA256, pem.contents());
    println!("serverCertificateHashes value (base64 SHA-256 of the DER cert):");
    println!("  {}", STANDARD.encode(hash.as_ref()));

    Ok(())
}
