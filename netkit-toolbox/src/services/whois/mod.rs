//! WHOIS lookup with ordered server fallback.
//!
//! A [`WhoisClient`] resolves the candidate servers for a domain's TLD from a
//! [`WhoisServerRegistry`], then asks each one in turn over a
//! [`WhoisTransport`]. The first successful answer is parsed into a
//! [`WhoisRecord`]; if every server fails, only the last failure is reported.

pub(crate) mod date;
pub(crate) mod parser;
pub(crate) mod servers;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::{ToolboxError, ToolboxResult, WhoisFailure, WhoisLookupError};
use crate::types::WhoisRecord;

pub use date::DateParser;
pub use parser::WhoisTextParser;
pub use servers::WhoisServerRegistry;

/// Well-known WHOIS port.
pub const WHOIS_PORT: u16 = 43;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const EXCHANGE_DEADLINE: Duration = Duration::from_secs(15);

/// One request/response exchange with a single WHOIS server.
#[async_trait]
pub trait WhoisTransport: Send + Sync {
    /// Send `domain` to `server` and return the full response text.
    async fn query(&self, server: &str, domain: &str) -> Result<String, WhoisFailure>;
}

/// Plain TCP transport: connect, write `domain\r\n`, read until EOF.
#[derive(Debug, Clone)]
pub struct TcpWhoisTransport {
    port: u16,
    connect_timeout: Duration,
    deadline: Duration,
}

impl Default for TcpWhoisTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpWhoisTransport {
    pub const fn new() -> Self {
        Self {
            port: WHOIS_PORT,
            connect_timeout: CONNECT_TIMEOUT,
            deadline: EXCHANGE_DEADLINE,
        }
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// `connect_timeout` bounds the dial; `deadline` bounds the whole exchange.
    #[must_use]
    pub const fn with_timeouts(mut self, connect_timeout: Duration, deadline: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.deadline = deadline;
        self
    }

    async fn exchange(&self, server: &str, domain: &str) -> Result<String, WhoisFailure> {
        let mut stream = match timeout(
            self.connect_timeout,
            TcpStream::connect((server, self.port)),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(WhoisFailure::Connect(e.to_string())),
            Err(_) => {
                return Err(WhoisFailure::Connect(format!(
                    "connect timed out after {}s",
                    self.connect_timeout.as_secs()
                )))
            }
        };

        stream
            .write_all(format!("{domain}\r\n").as_bytes())
            .await
            .map_err(|e| WhoisFailure::Write(e.to_string()))?;

        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .await
            .map_err(|e| WhoisFailure::Read(e.to_string()))?;

        let text = String::from_utf8_lossy(&buf).into_owned();
        if text.trim().is_empty() {
            return Err(WhoisFailure::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl WhoisTransport for TcpWhoisTransport {
    async fn query(&self, server: &str, domain: &str) -> Result<String, WhoisFailure> {
        timeout(self.deadline, self.exchange(server, domain))
            .await
            .unwrap_or(Err(WhoisFailure::DeadlineExceeded(self.deadline.as_secs())))
    }
}

/// WHOIS client with per-TLD server fallback.
#[derive(Clone)]
pub struct WhoisClient {
    registry: Arc<WhoisServerRegistry>,
    transport: Arc<dyn WhoisTransport>,
    parser: WhoisTextParser,
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WhoisClient {
    /// Built-in server table over plain TCP.
    pub fn new() -> Self {
        Self::with_parts(
            Arc::new(WhoisServerRegistry::default()),
            Arc::new(TcpWhoisTransport::new()),
        )
    }

    pub fn with_parts(
        registry: Arc<WhoisServerRegistry>,
        transport: Arc<dyn WhoisTransport>,
    ) -> Self {
        Self {
            registry,
            transport,
            parser: WhoisTextParser,
        }
    }

    pub fn registry(&self) -> &WhoisServerRegistry {
        &self.registry
    }

    /// Query the candidate servers in order and stop at the first answer.
    ///
    /// The domain is trimmed and lowercased before use. Servers are never
    /// queried concurrently.
    pub async fn lookup(&self, domain: &str) -> ToolboxResult<WhoisRecord> {
        let domain = domain.trim().to_lowercase();
        if domain.is_empty() {
            return Err(ToolboxError::ValidationError(
                "Domain name is required".to_string(),
            ));
        }

        let servers = self.registry.servers_for(&domain)?;
        debug!(
            "[WHOIS] Looking up {domain} ({} candidate server(s))",
            servers.len()
        );

        let mut last_error: Option<WhoisLookupError> = None;
        for server in servers {
            trace!("[WHOIS] Querying {server} for {domain}");
            match self.transport.query(server, &domain).await {
                Ok(raw) => {
                    debug!("[WHOIS] {server} answered for {domain} ({} bytes)", raw.len());
                    return Ok(self.parser.parse(&domain, &raw, server));
                }
                Err(cause) => {
                    warn!("[WHOIS] {server} failed for {domain}: {cause}");
                    last_error = Some(WhoisLookupError {
                        domain: domain.clone(),
                        server: server.clone(),
                        cause,
                    });
                }
            }
        }

        Err(last_error.map_or_else(
            || ToolboxError::NetworkError(format!("No WHOIS servers configured for {domain}")),
            ToolboxError::AllServersFailed,
        ))
    }
}
