//! Seam between the HTTP handlers and the toolbox.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use netkit_toolbox::{
    CertificateRecord, CleanUrlResponse, DnsLookupResponse, HttpHeadersResponse, IpInfoResponse,
    ResolveRedirectResponse, StackAnalyzerResponse, ToolboxResult, ToolboxService,
    UtmGeneratorRequest, UtmGeneratorResponse, WhoisRecord,
};
use tokio::time::timeout;

use crate::config::TimeoutConfig;

/// Outer deadline per endpoint group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolTimeouts {
    pub whois_lookup: Duration,
    pub ssl_check: Duration,
    pub dns_lookup: Duration,
    pub ip_info: Duration,
    pub http: Duration,
}

impl Default for ToolTimeouts {
    fn default() -> Self {
        Self::from(TimeoutConfig::default())
    }
}

impl From<TimeoutConfig> for ToolTimeouts {
    fn from(config: TimeoutConfig) -> Self {
        Self {
            whois_lookup: Duration::from_secs(config.whois_secs),
            ssl_check: Duration::from_secs(config.ssl_secs),
            dns_lookup: Duration::from_secs(config.dns_secs),
            ip_info: Duration::from_secs(config.ip_secs),
            http: Duration::from_secs(config.http_secs),
        }
    }
}

#[async_trait]
pub trait ToolboxGateway: Send + Sync {
    async fn whois_lookup(&self, domain: &str) -> ToolboxResult<WhoisRecord>;

    async fn ssl_check(&self, host: &str, port: u16) -> ToolboxResult<CertificateRecord>;

    async fn dns_lookup(
        &self,
        domain: &str,
        record_types: &[String],
    ) -> ToolboxResult<DnsLookupResponse>;

    async fn ip_info(&self, ip: &str) -> IpInfoResponse;

    fn clean_url(&self, url: &str) -> ToolboxResult<CleanUrlResponse>;

    fn generate_utm(&self, request: &UtmGeneratorRequest) -> ToolboxResult<UtmGeneratorResponse>;

    async fn resolve_redirect(&self, url: &str) -> ResolveRedirectResponse;

    async fn http_headers(&self, url: &str) -> HttpHeadersResponse;

    async fn analyze_stack(&self, url: &str) -> StackAnalyzerResponse;
}

/// Gateway backed by one shared [`ToolboxService`].
pub struct DefaultToolboxGateway {
    service: ToolboxService,
}

impl DefaultToolboxGateway {
    pub const fn new(service: ToolboxService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolboxGateway for DefaultToolboxGateway {
    async fn whois_lookup(&self, domain: &str) -> ToolboxResult<WhoisRecord> {
        self.service.whois_lookup(domain).await
    }

    async fn ssl_check(&self, host: &str, port: u16) -> ToolboxResult<CertificateRecord> {
        self.service.ssl_check(host, Some(port)).await
    }

    async fn dns_lookup(
        &self,
        domain: &str,
        record_types: &[String],
    ) -> ToolboxResult<DnsLookupResponse> {
        self.service.dns_lookup(domain, record_types).await
    }

    async fn ip_info(&self, ip: &str) -> IpInfoResponse {
        self.service.ip_info(ip).await
    }

    fn clean_url(&self, url: &str) -> ToolboxResult<CleanUrlResponse> {
        self.service.clean_url(url)
    }

    fn generate_utm(&self, request: &UtmGeneratorRequest) -> ToolboxResult<UtmGeneratorResponse> {
        self.service.generate_utm(request)
    }

    async fn resolve_redirect(&self, url: &str) -> ResolveRedirectResponse {
        self.service.resolve_redirect(url).await
    }

    async fn http_headers(&self, url: &str) -> HttpHeadersResponse {
        self.service.http_headers(url).await
    }

    async fn analyze_stack(&self, url: &str) -> StackAnalyzerResponse {
        self.service.analyze_stack(url).await
    }
}

/// Run a toolbox operation under an outer deadline.
///
/// Errors come back as the message that goes into the response body.
pub async fn run_toolbox_tool<T>(
    duration: Duration,
    future: impl Future<Output = ToolboxResult<T>>,
    tool_name: &str,
) -> Result<T, String> {
    timeout(duration, future)
        .await
        .map_err(|_| {
            tracing::warn!("{tool_name} timed out after {}s", duration.as_secs());
            format!("{tool_name} timed out after {}s", duration.as_secs())
        })?
        .map_err(|e| {
            tracing::debug!("{tool_name} failed: {e}");
            e.detail()
        })
}
