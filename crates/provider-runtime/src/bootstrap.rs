//! # Bootstrapper
//!
//! The host writes one line to the provider's stdin at start-up: the
//! `HostData` JSON document, raw or base64-wrapped depending on the host
//! version. Nothing else is ever read from stdin.
//!
//! The same host data names the broker and, optionally, the user JWT and
//! seed the provider logs in with; [`lattice_connector`] turns those into a
//! ready [`NatsConnector`].

use crate::errors::BootstrapError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use lattice_bus::{NatsConnector, NonceSigner};
use lattice_crypto::{CryptoError, KeyPair};
use lattice_types::HostData;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info};

/// How long the host has to deliver host data.
pub const BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Reads host data once from a line-oriented source.
pub struct Bootstrapper<R> {
    reader: BufReader<R>,
    timeout: Duration,
}

impl Bootstrapper<tokio::io::Stdin> {
    /// Bootstrapper over the process's standard input.
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

impl<R: AsyncRead + Unpin> Bootstrapper<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            timeout: BOOTSTRAP_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read and decode the single host data line.
    pub async fn read_host_data(mut self) -> Result<HostData, BootstrapError> {
        let mut line = String::new();
        let read = tokio::time::timeout(self.timeout, self.reader.read_line(&mut line))
            .await
            .map_err(|_| BootstrapError::Timeout(self.timeout))??;
        if read == 0 {
            return Err(BootstrapError::Decode(
                "input closed before host data arrived".to_string(),
            ));
        }

        let host = decode_host_data(&line)?;
        info!(
            provider_key = %host.provider_key,
            lattice = %host.lattice_rpc_prefix,
            links = host.link_definitions.len(),
            "Host data received"
        );
        Ok(host)
    }
}

/// Decode one host data line: raw JSON when it starts with `{`, otherwise
/// standard base64 around JSON.
pub fn decode_host_data(line: &str) -> Result<HostData, BootstrapError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(BootstrapError::Decode("empty host data".to_string()));
    }

    let json = if line.starts_with('{') {
        debug!("Host data is raw JSON");
        line.as_bytes().to_vec()
    } else {
        debug!("Host data is base64 encoded");
        STANDARD
            .decode(line)
            .map_err(|e| BootstrapError::Decode(format!("invalid base64: {e}")))?
    };

    serde_json::from_slice(&json)
        .map_err(|e| BootstrapError::Decode(format!("invalid JSON: {e}")))
}

/// Broker connector for the lattice in `host`. A non-empty user JWT makes
/// the connector answer the login challenge with the user seed.
pub fn lattice_connector(host: &HostData) -> Result<NatsConnector, CryptoError> {
    if host.lattice_rpc_user_jwt.is_empty() {
        return Ok(NatsConnector::new());
    }
    let signer = nonce_signer(host.lattice_rpc_user_seed.reveal())?;
    debug!("Lattice login uses the host supplied user JWT");
    Ok(NatsConnector::new().with_credentials(host.lattice_rpc_user_jwt.clone(), signer))
}

fn nonce_signer(seed: &str) -> Result<NonceSigner, CryptoError> {
    let user = KeyPair::from_seed(seed)?;
    let signer: NonceSigner = Arc::new(move |nonce: &[u8]| {
        Ok::<_, String>(user.signer().sign(nonce).as_bytes().to_vec())
    });
    Ok(signer)
}
