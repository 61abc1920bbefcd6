//! Service façade exposing all toolbox operations.
//!
//! [`ToolboxService`] owns the long-lived pieces (WHOIS client, TLS probe,
//! resolver, GeoIP readers, HTTP clients, rule tables) and is cheap to clone.

mod dns;
mod geoip;
mod http_client;
mod http_headers;
mod ip;
mod redirect;
mod resolver;
mod ssl;
mod stack;
mod url_cleaner;
mod utm;
mod whois;

use std::sync::Arc;

use hickory_resolver::TokioResolver;

use crate::error::{ToolboxError, ToolboxResult};
use crate::types::{
    CertificateRecord, CleanUrlResponse, DnsLookupResponse, HttpHeadersResponse, IpInfoResponse,
    ResolveRedirectResponse, StackAnalyzerResponse, UtmGeneratorRequest, UtmGeneratorResponse,
    WhoisRecord,
};

pub use geoip::{GeoIpStore, MaxMindGeoIpStore};
pub use http_client::{FetchedPage, PageFetcher};
pub use redirect::RedirectResolver;
pub use resolver::{build_resolver, build_system_resolver};
pub use ssl::{CertificateProbe, CertificateValidator, DEFAULT_TLS_PORT};
pub use stack::{SignatureMatcher, TechnologyMatcher};
pub use url_cleaner::TrackingRules;
pub use whois::{
    DateParser, TcpWhoisTransport, WhoisClient, WhoisServerRegistry, WhoisTextParser,
    WhoisTransport,
};

/// Validate and normalise a domain name or IP address input.
///
/// Trims whitespace, passes through valid IP addresses unchanged, converts
/// internationalised domain names (IDN) to ASCII via IDNA 2008, and rejects
/// empty or overlong inputs.
fn validate_domain(domain: &str) -> ToolboxResult<String> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(ToolboxError::ValidationError(
            "Domain name is required".to_string(),
        ));
    }
    // If it's a valid IP address, pass through without IDNA processing.
    if domain.parse::<std::net::IpAddr>().is_ok() {
        return Ok(domain.to_string());
    }
    // IDNA processing: converts Unicode labels to Punycode and validates.
    let ascii_domain = idna::domain_to_ascii_strict(domain)
        .map_err(|_| ToolboxError::ValidationError(format!("Invalid domain name: {domain}")))?;
    if ascii_domain.len() > 253 {
        return Err(ToolboxError::ValidationError(format!(
            "Domain name exceeds maximum length of 253 characters (got {})",
            ascii_domain.len()
        )));
    }
    Ok(ascii_domain)
}

/// Entry point for all network diagnostic operations.
///
/// ```rust,no_run
/// use netkit_toolbox::ToolboxService;
/// # async fn demo() -> netkit_toolbox::ToolboxResult<()> {
/// let toolbox = ToolboxService::new()?;
/// let record = toolbox.whois_lookup("example.com").await?;
/// println!("{}", record.registrar);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ToolboxService {
    whois: WhoisClient,
    probe: CertificateProbe,
    resolver: TokioResolver,
    geoip: Arc<dyn GeoIpStore>,
    fetcher: PageFetcher,
    redirects: RedirectResolver,
    matcher: Arc<dyn TechnologyMatcher>,
    tracking: Arc<TrackingRules>,
}

impl ToolboxService {
    /// Built-in tables, system resolver, no GeoIP databases.
    pub fn new() -> ToolboxResult<Self> {
        Ok(Self {
            whois: WhoisClient::new(),
            probe: CertificateProbe::new()?,
            resolver: build_system_resolver(),
            geoip: Arc::new(MaxMindGeoIpStore::disabled()),
            fetcher: PageFetcher::new()?,
            redirects: RedirectResolver::new()?,
            matcher: Arc::new(SignatureMatcher::builtin()?),
            tracking: Arc::new(TrackingRules::builtin()?),
        })
    }

    #[must_use]
    pub fn with_whois_client(mut self, whois: WhoisClient) -> Self {
        self.whois = whois;
        self
    }

    #[must_use]
    pub fn with_probe(mut self, probe: CertificateProbe) -> Self {
        self.probe = probe;
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: TokioResolver) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn with_geoip(mut self, geoip: Arc<dyn GeoIpStore>) -> Self {
        self.geoip = geoip;
        self
    }

    #[must_use]
    pub fn with_matcher(mut self, matcher: Arc<dyn TechnologyMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    #[must_use]
    pub fn with_tracking_rules(mut self, rules: TrackingRules) -> Self {
        self.tracking = Arc::new(rules);
        self
    }

    /// Query WHOIS, trying each candidate server for the TLD in turn.
    pub async fn whois_lookup(&self, domain: &str) -> ToolboxResult<WhoisRecord> {
        let domain = validate_domain(domain)?;
        self.whois.lookup(&domain).await
    }

    /// Inspect the certificate served at `host:port` (443 when `None`).
    pub async fn ssl_check(&self, host: &str, port: Option<u16>) -> ToolboxResult<CertificateRecord> {
        let host = validate_domain(host)?;
        self.probe
            .probe(&host, port.unwrap_or(DEFAULT_TLS_PORT))
            .await
    }

    /// Resolve the requested record types (A, AAAA, MX, CNAME, TXT, NS when empty).
    pub async fn dns_lookup(
        &self,
        domain: &str,
        record_types: &[String],
    ) -> ToolboxResult<DnsLookupResponse> {
        let domain = validate_domain(domain)?;
        Ok(dns::dns_lookup(&self.resolver, &domain, record_types).await)
    }

    /// Classify an address and enrich it with reverse DNS and GeoIP data.
    pub async fn ip_info(&self, ip: &str) -> IpInfoResponse {
        ip::ip_info(&self.resolver, self.geoip.as_ref(), ip).await
    }

    pub fn clean_url(&self, url: &str) -> ToolboxResult<CleanUrlResponse> {
        self.tracking.clean(url)
    }

    pub fn generate_utm(&self, request: &UtmGeneratorRequest) -> ToolboxResult<UtmGeneratorResponse> {
        utm::generate_utm(request)
    }

    pub async fn resolve_redirect(&self, url: &str) -> ResolveRedirectResponse {
        self.redirects.resolve(url).await
    }

    pub async fn http_headers(&self, url: &str) -> HttpHeadersResponse {
        http_headers::http_headers(&self.fetcher, url).await
    }

    pub async fn analyze_stack(&self, url: &str) -> StackAnalyzerResponse {
        stack::analyze_stack(&self.fetcher, self.matcher.as_ref(), url).await
    }
}
