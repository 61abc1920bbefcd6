//! SSL/TLS certificate inspection module.
//!
//! The handshake deliberately skips trust verification so that self-signed,
//! expired or mismatched certificates can still be reported on. Trust is then
//! judged by [`CertificateValidator`] and surfaced as `validation_errors`.

pub(crate) mod certificate;
pub(crate) mod validation;
mod verifier;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, trace, warn};
use rustls::ProtocolVersion;
use rustls_pki_types::ServerName;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

use crate::error::{ToolboxError, ToolboxResult};
use crate::types::CertificateRecord;

pub use validation::CertificateValidator;

pub const DEFAULT_TLS_PORT: u16 = 443;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens a TLS session and reports on whatever certificate the peer presents.
#[derive(Clone)]
pub struct CertificateProbe {
    connector: TlsConnector,
    connect_timeout: Duration,
    handshake_timeout: Duration,
    validator: CertificateValidator,
}

impl CertificateProbe {
    pub fn new() -> ToolboxResult<Self> {
        let config = verifier::probe_client_config().map_err(|e| {
            ToolboxError::NetworkError(format!("Failed to build TLS client config: {e}"))
        })?;
        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            connect_timeout: CONNECT_TIMEOUT,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            validator: CertificateValidator,
        })
    }

    #[must_use]
    pub const fn with_timeouts(mut self, connect: Duration, handshake: Duration) -> Self {
        self.connect_timeout = connect;
        self.handshake_timeout = handshake;
        self
    }

    /// Handshake with `host:port`, extract the peer chain and validate it
    /// against `host`.
    pub async fn probe(&self, host: &str, port: u16) -> ToolboxResult<CertificateRecord> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ToolboxError::ValidationError(
                "Domain name is required".to_string(),
            ));
        }
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| ToolboxError::ValidationError(format!("Invalid host name {host}: {e}")))?;

        debug!("[SSL] Starting check for {host}:{port}");
        let start_time = Instant::now();

        trace!("[SSL] Establishing TCP connection...");
        let stream = match timeout(self.connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => {
                warn!("[SSL] TCP connection failed: {e}");
                return Err(ToolboxError::probe_failure(
                    host,
                    format!("connection failed: {e}"),
                ));
            }
            Err(_) => {
                warn!(
                    "[SSL] TCP connection timeout ({}s)",
                    self.connect_timeout.as_secs()
                );
                return Err(ToolboxError::probe_failure(host, "connection timed out"));
            }
        };

        trace!("[SSL] Performing TLS handshake...");
        let tls_stream = match timeout(
            self.handshake_timeout,
            self.connector.connect(server_name, stream),
        )
        .await
        {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => {
                warn!("[SSL] TLS handshake failed: {e}");
                return Err(ToolboxError::probe_failure(
                    host,
                    format!("TLS handshake failed: {e}"),
                ));
            }
            Err(_) => {
                warn!(
                    "[SSL] TLS handshake timeout ({}s)",
                    self.handshake_timeout.as_secs()
                );
                return Err(ToolboxError::probe_failure(host, "TLS handshake timed out"));
            }
        };

        let (_, session) = tls_stream.get_ref();
        let chain = match session.peer_certificates() {
            Some(certs) if !certs.is_empty() => certs,
            _ => {
                warn!("[SSL] No certificates presented by {host}");
                return Err(ToolboxError::probe_failure(host, "no certificates presented"));
            }
        };
        trace!("[SSL] Retrieved {} certificate(s)", chain.len());

        let now = Utc::now();
        let mut record = certificate::record_from_chain(host, chain, now)?;
        record.tls_version = session
            .protocol_version()
            .map(tls_version_name)
            .unwrap_or_default();
        record.cipher_suite = session
            .negotiated_cipher_suite()
            .map(|cs| format!("{:?}", cs.suite()))
            .unwrap_or_default();
        record.validation_errors = self.validator.validate_at(&record, host, now);

        debug!(
            "[SSL] Check completed: {host} - valid={}, days_until_expiry={}, chain_length={}, issues={}, total_time={:?}",
            record.is_valid,
            record.days_until_expiry,
            record.certificate_chain.len(),
            record.validation_errors.len(),
            start_time.elapsed()
        );
        Ok(record)
    }
}

fn tls_version_name(version: ProtocolVersion) -> String {
    match version {
        ProtocolVersion::TLSv1_0 => "TLS 1.0".to_string(),
        ProtocolVersion::TLSv1_1 => "TLS 1.1".to_string(),
        ProtocolVersion::TLSv1_2 => "TLS 1.2".to_string(),
        ProtocolVersion::TLSv1_3 => "TLS 1.3".to_string(),
        other => format!("Unknown ({})", u16::from(other)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_version_names() {
        assert_eq!(tls_version_name(ProtocolVersion::TLSv1_2), "TLS 1.2");
        assert_eq!(tls_version_name(ProtocolVersion::TLSv1_3), "TLS 1.3");
        assert_eq!(tls_version_name(ProtocolVersion::TLSv1_0), "TLS 1.0");
        assert_eq!(
            tls_version_name(ProtocolVersion::SSLv3),
            format!("Unknown ({})", 0x0300)
        );
    }

    #[tokio::test]
    async fn test_empty_host_rejected_before_io() {
        let probe = CertificateProbe::new().unwrap();
        assert!(matches!(
            probe.probe("  ", 443).await,
            Err(ToolboxError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_refused_connection_is_probe_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = CertificateProbe::new().unwrap();
        let err = probe.probe("127.0.0.1", port).await.unwrap_err();
        assert!(matches!(err, ToolboxError::ProbeFailure { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_plaintext_peer_is_probe_failure() {
        use tokio::io::AsyncWriteExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let _ = socket
                .write_all(b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\n\r\n")
                .await;
        });

        let probe = CertificateProbe::new()
            .unwrap()
            .with_timeouts(Duration::from_secs(2), Duration::from_secs(2));
        let err = probe.probe("localhost", port).await.unwrap_err();
        assert!(err.to_string().starts_with("SSL check failed for localhost"), "{err}");
    }

    // NOTE: These tests depend on external networks; failures may be due to firewall/proxy issues

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_probe_real_site() {
        let probe = CertificateProbe::new().unwrap();
        let record = probe
            .probe("google.com", DEFAULT_TLS_PORT)
            .await
            .unwrap_or_else(|e| panic!("SSL check failed: {e}"));
        assert!(record.is_valid);
        assert!(record.days_until_expiry > 0);
        assert!(!record.subject_alt_names.is_empty());
        assert!(!record.certificate_chain.is_empty());
        assert!(record.tls_version.starts_with("TLS 1."));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_probe_self_signed_site() {
        let probe = CertificateProbe::new().unwrap();
        let record = probe
            .probe("self-signed.badssl.com", DEFAULT_TLS_PORT)
            .await
            .unwrap_or_else(|e| panic!("SSL check failed: {e}"));
        assert!(record.is_self_signed);
    }
}
