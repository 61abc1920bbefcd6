//! Public types returned by toolbox operations.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==================== WHOIS ====================

/// Registration data parsed from a WHOIS response.
///
/// Date fields stay `None` when the server did not send them or sent a value
/// none of the known layouts could read; `None` means "unknown".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhoisRecord {
    pub domain: String,
    pub registrar: String,
    pub creation_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
    pub name_servers: Vec<String>,
    pub status: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrant_org: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrant_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_email: Option<String>,
    /// Server that produced the response.
    pub whois_server: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_text: String,
    pub query_time: DateTime<Utc>,
}

// ==================== TLS certificate ====================

/// Certificate metadata gathered from a TLS handshake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// Host that was probed.
    pub domain: String,
    pub is_valid: bool,
    pub issuer: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    pub serial_number: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// Whole days left; negative once expired.
    pub days_until_expiry: i64,
    pub subject_alt_names: Vec<String>,
    pub signature_algorithm: String,
    pub public_key_algorithm: String,
    /// Key size in bits, 0 when unknown.
    pub key_size: u32,
    pub version: u32,
    pub is_self_signed: bool,
    pub is_wildcard: bool,
    pub crl_distribution_points: Vec<String>,
    pub ocsp_servers: Vec<String>,
    /// Certificates as presented by the peer, leaf first.
    pub certificate_chain: Vec<ChainEntry>,
    pub tls_version: String,
    pub cipher_suite: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
    pub query_time: DateTime<Utc>,
}

/// One certificate of the presented chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub subject: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub is_ca: bool,
    pub key_usage: Vec<String>,
}

// ==================== DNS ====================

/// Record types accepted by the DNS lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordKind {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
    /// Mail exchange record.
    Mx,
    /// Canonical name (alias) record.
    Cname,
    /// Text record.
    Txt,
    /// Name server record.
    Ns,
}

impl DnsRecordKind {
    /// Types queried when the caller does not name any.
    pub const DEFAULT_SET: [Self; 6] = [
        Self::A,
        Self::Aaaa,
        Self::Mx,
        Self::Cname,
        Self::Txt,
        Self::Ns,
    ];
}

impl fmt::Display for DnsRecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::Aaaa => write!(f, "AAAA"),
            Self::Mx => write!(f, "MX"),
            Self::Cname => write!(f, "CNAME"),
            Self::Txt => write!(f, "TXT"),
            Self::Ns => write!(f, "NS"),
        }
    }
}

impl FromStr for DnsRecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "MX" => Ok(Self::Mx),
            "CNAME" => Ok(Self::Cname),
            "TXT" => Ok(Self::Txt),
            "NS" => Ok(Self::Ns),
            _ => Err(format!("Unsupported record type: {}", s.trim())),
        }
    }
}

/// A single DNS answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

/// DNS lookup output keyed by record type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsLookupResponse {
    pub domain: String,
    pub records: BTreeMap<String, Vec<DnsRecord>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

// ==================== IP ====================

/// Address classification, reverse DNS and GeoIP data for one IP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpInfoResponse {
    pub ip_address: String,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub is_loopback: bool,
    pub is_private: bool,
    pub is_multicast: bool,
    pub is_link_local_unicast: bool,
    pub is_global_unicast: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reverse_dns_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub geo: GeoDetails,
}

/// Fields filled from the City and ASN databases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_error: Option<String>,
}

// ==================== URL cleaning ====================

/// A query parameter removed by the URL cleaner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedParam {
    pub parameter: String,
    pub value: String,
    pub company: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    /// Rule key that matched (the prefix for prefix rules).
    pub matched_rule: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanUrlResponse {
    pub original_url: String,
    pub cleaned_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_params: Vec<RemovedParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ==================== UTM ====================

/// Formatting applied to every UTM value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmOptions {
    #[serde(default)]
    pub force_lowercase: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_replacement: Option<String>,
}

/// Parameters shared by every generated link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmCommonParams {
    pub utm_campaign: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
}

/// Per-link parameters; non-empty values override the common ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmParameterSet {
    pub utm_source: String,
    pub utm_medium: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmGeneratorRequest {
    pub base_url: String,
    pub common_params: UtmCommonParams,
    pub variable_sets: Vec<UtmParameterSet>,
    #[serde(default)]
    pub options: Option<UtmOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedUtmLink {
    pub source: String,
    pub medium: String,
    pub campaign: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub full_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmGeneratorResponse {
    pub base_url: String,
    pub generated_urls: Vec<GeneratedUtmLink>,
    pub options_applied: UtmOptions,
}

// ==================== HTTP ====================

/// Outcome of following a URL's redirect chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRedirectResponse {
    pub original_url: String,
    /// Last URL reached, also set on some failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response headers of a fetched URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpHeadersResponse {
    pub request_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ==================== Stack analysis ====================

/// A technology recognised on a fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedTechnology {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpe: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackAnalyzerResponse {
    pub request_url: String,
    pub final_url: String,
    pub technologies: Vec<DetectedTechnology>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
