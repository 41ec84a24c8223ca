//! TLS settings for `wss://` targets.
//!
//! The bridge does not validate credentials itself: it loads the PEM files
//! it is pointed at and hands them to `native-tls`.

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use native_tls::{Identity, TlsConnector};
use tokio_tungstenite::Connector;
use tracing::{debug, warn};

use crate::console::OutputSink;
use crate::error::ConnectError;

// ============================================================================
// TlsCredential
// ============================================================================

/// Client certificate presented during the TLS handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsCredential {
    /// A single PEM file holding both the certificate chain and the key.
    CertPath(PathBuf),

    /// Separate certificate and key files.
    Bundle {
        /// PEM certificate chain.
        cert_file: PathBuf,
        /// PEM PKCS#8 private key.
        key_file: PathBuf,
        /// Key password. Encrypted keys are not supported by the TLS
        /// backend, so a password is reported and ignored.
        key_password: Option<String>,
    },
}

// ============================================================================
// TlsOptions
// ============================================================================

/// TLS settings of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    /// Verify the server certificate and host name.
    pub verify: bool,
    /// Optional client credential.
    pub credential: Option<TlsCredential>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            verify: true,
            credential: None,
        }
    }
}

impl TlsOptions {
    /// Returns `true` when the default TLS connector is enough.
    #[inline]
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.verify && self.credential.is_none()
    }

    /// Builds the connector used for a `wss://` handshake.
    ///
    /// Returns `None` for plaintext targets or default settings, letting
    /// tokio-tungstenite pick its own connector.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::InvalidHandshake`] if the credential files
    /// cannot be read or parsed, or the connector cannot be built.
    pub(crate) async fn connector(
        &self,
        secure: bool,
        output: &OutputSink,
    ) -> Result<Option<Connector>, ConnectError> {
        if !secure {
            if self.credential.is_some() {
                debug!("TLS credential ignored for plaintext target");
            }
            return Ok(None);
        }
        if self.is_default() {
            return Ok(None);
        }

        let mut builder = TlsConnector::builder();

        if self.verify {
            if let Some(credential) = &self.credential {
                builder.identity(load_identity(credential, output).await?);
            }
        } else {
            if self.credential.is_some() {
                output.line("TLS verification disabled, client certificate ignored");
                warn!("TLS verification disabled, client certificate ignored");
            }
            builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        let connector = builder
            .build()
            .map_err(|e| ConnectError::invalid_handshake(format!("TLS setup failed: {e}")))?;
        Ok(Some(Connector::NativeTls(connector)))
    }
}

async fn load_identity(
    credential: &TlsCredential,
    output: &OutputSink,
) -> Result<Identity, ConnectError> {
    let (cert_file, key_file) = match credential {
        TlsCredential::CertPath(path) => (path, path),
        TlsCredential::Bundle {
            cert_file,
            key_file,
            key_password,
        } => {
            if key_password.is_some() {
                output.line("Encrypted private keys are not supported, key password ignored");
                warn!("key password ignored");
            }
            (cert_file, key_file)
        }
    };

    let read = |path: &PathBuf| {
        let path = path.clone();
        async move {
            tokio::fs::read(&path).await.map_err(|e| {
                ConnectError::invalid_handshake(format!(
                    "cannot read TLS credential {}: {e}",
                    path.display()
                ))
            })
        }
    };
    let cert = read(cert_file).await?;
    let key = read(key_file).await?;

    Identity::from_pkcs8(&cert, &key)
        .map_err(|e| ConnectError::invalid_handshake(format!("invalid TLS credential: {e}")))
}

// ============================================================================
// Tests
// ============================================================================
