use super::*;

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use netkit_toolbox::{
    CleanUrlResponse, DnsRecord, GeneratedUtmLink, ToolboxError, UtmGeneratorResponse,
};

/// Gateway double that records every call and answers with canned data.
#[derive(Default)]
pub struct MockToolboxGateway {
    pub calls: Mutex<Vec<String>>,
    pub record_types: Mutex<Vec<Vec<String>>>,
    pub ssl_ports: Mutex<Vec<u16>>,
    failure: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
}

impl MockToolboxGateway {
    /// Every fallible call fails with `ValidationError(message)`; the
    /// infallible ones carry `message` in their `error` field.
    pub fn set_error(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn failure(&self) -> Option<String> {
        self.failure.lock().unwrap().clone()
    }

    fn check(&self) -> ToolboxResult<()> {
        match self.failure() {
            Some(message) => Err(ToolboxError::ValidationError(message)),
            None => Ok(()),
        }
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ToolboxGateway for MockToolboxGateway {
    async fn whois_lookup(&self, domain: &str) -> ToolboxResult<WhoisRecord> {
        self.record(format!("whois_lookup:{domain}"));
        self.pause().await;
        self.check()?;
        Ok(WhoisRecord {
            domain: domain.to_string(),
            registrar: "Example Registrar, Inc.".to_string(),
            name_servers: vec!["ns1.example.net".to_string()],
            whois_server: "whois.example.net".to_string(),
            query_time: Utc::now(),
            ..Default::default()
        })
    }

    async fn ssl_check(&self, host: &str, port: u16) -> ToolboxResult<CertificateRecord> {
        self.record(format!("ssl_check:{host}:{port}"));
        self.ssl_ports.lock().unwrap().push(port);
        self.pause().await;
        self.check()?;
        Ok(CertificateRecord {
            domain: host.to_string(),
            is_valid: true,
            common_name: Some(host.to_string()),
            query_time: Utc::now(),
            ..Default::default()
        })
    }

    async fn dns_lookup(
        &self,
        domain: &str,
        record_types: &[String],
    ) -> ToolboxResult<DnsLookupResponse> {
        self.record(format!("dns_lookup:{domain}"));
        self.record_types
            .lock()
            .unwrap()
            .push(record_types.to_vec());
        self.pause().await;
        self.check()?;
        let mut records = BTreeMap::new();
        records.insert(
            "A".to_string(),
            vec![DnsRecord {
                record_type: "A".to_string(),
                value: "93.184.215.14".to_string(),
                priority: None,
                ttl: Some(300),
            }],
        );
        Ok(DnsLookupResponse {
            domain: domain.to_string(),
            records,
            errors: BTreeMap::new(),
        })
    }

    async fn ip_info(&self, ip: &str) -> IpInfoResponse {
        self.record(format!("ip_info:{ip}"));
        self.pause().await;
        IpInfoResponse {
            ip_address: ip.to_string(),
            is_valid: self.failure().is_none(),
            error: self.failure(),
            ..Default::default()
        }
    }

    fn clean_url(&self, url: &str) -> ToolboxResult<CleanUrlResponse> {
        self.record(format!("clean_url:{url}"));
        self.check()?;
        Ok(CleanUrlResponse {
            original_url: url.to_string(),
            cleaned_url: url.to_string(),
            removed_params: Vec::new(),
            message: Some("No tracking parameters found to remove.".to_string()),
        })
    }

    fn generate_utm(&self, request: &UtmGeneratorRequest) -> ToolboxResult<UtmGeneratorResponse> {
        self.record(format!("generate_utm:{}", request.base_url));
        self.check()?;
        let generated_urls = request
            .variable_sets
            .iter()
            .map(|set| GeneratedUtmLink {
                source: set.utm_source.clone(),
                medium: set.utm_medium.clone(),
                campaign: request.common_params.utm_campaign.clone(),
                term: None,
                content: None,
                full_url: format!(
                    "{}?utm_source={}",
                    request.base_url, set.utm_source
                ),
            })
            .collect();
        Ok(UtmGeneratorResponse {
            base_url: request.base_url.clone(),
            generated_urls,
            options_applied: request.options.clone().unwrap_or_default(),
        })
    }

    async fn resolve_redirect(&self, url: &str) -> ResolveRedirectResponse {
        self.record(format!("resolve_redirect:{url}"));
        self.pause().await;
        ResolveRedirectResponse {
            original_url: url.to_string(),
            final_url: Some("https://example.com/final".to_string()),
            error: self.failure(),
        }
    }

    async fn http_headers(&self, url: &str) -> HttpHeadersResponse {
        self.record(format!("http_headers:{url}"));
        self.pause().await;
        let mut headers = BTreeMap::new();
        headers.insert("Server".to_string(), vec!["nginx".to_string()]);
        HttpHeadersResponse {
            request_url: url.to_string(),
            final_url: Some(url.to_string()),
            status_code: Some(200),
            status: Some("200 OK".to_string()),
            headers,
            error: self.failure(),
        }
    }

    async fn analyze_stack(&self, url: &str) -> StackAnalyzerResponse {
        self.record(format!("analyze_stack:{url}"));
        self.pause().await;
        StackAnalyzerResponse {
            request_url: url.to_string(),
            final_url: url.to_string(),
            technologies: Vec::new(),
            error: self.failure(),
        }
    }
}
