//! X.509 field extraction for the TLS probe.
//!
//! Pure functions over DER bytes; the current time is passed in so results
//! are reproducible in tests.

use chrono::{DateTime, Utc};
use log::warn;
use rustls_pki_types::CertificateDer;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

use crate::error::{ToolboxError, ToolboxResult};
use crate::types::{CertificateRecord, ChainEntry};

const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
const OID_ED25519: &str = "1.3.101.112";
const OID_DSA: &str = "1.2.840.10040.4.1";
const OID_OCSP: &str = "1.3.6.1.5.5.7.48.1";

const SECONDS_PER_DAY: i64 = 86_400;

/// Signature algorithm OIDs mapped to display names.
const SIGNATURE_ALGORITHMS: &[(&str, &str)] = &[
    ("1.2.840.113549.1.1.4", "MD5-RSA"),
    ("1.2.840.113549.1.1.5", "SHA1-RSA"),
    ("1.2.840.113549.1.1.10", "RSA-PSS"),
    ("1.2.840.113549.1.1.11", "SHA256-RSA"),
    ("1.2.840.113549.1.1.12", "SHA384-RSA"),
    ("1.2.840.113549.1.1.13", "SHA512-RSA"),
    ("1.2.840.10040.4.3", "DSA-SHA1"),
    ("1.2.840.10045.4.1", "ECDSA-SHA1"),
    ("1.2.840.10045.4.3.2", "ECDSA-SHA256"),
    ("1.2.840.10045.4.3.3", "ECDSA-SHA384"),
    ("1.2.840.10045.4.3.4", "ECDSA-SHA512"),
    (OID_ED25519, "Ed25519"),
];

/// Named curve OIDs and their field size.
const NAMED_CURVES: &[(&str, u32)] = &[
    ("1.2.840.10045.3.1.7", 256),
    ("1.3.132.0.34", 384),
    ("1.3.132.0.35", 521),
];

/// Public key algorithms the probe can size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyAlgorithm {
    Rsa { bits: u32 },
    Ec { curve_bits: u32 },
    Ed25519,
    Unknown,
}

impl KeyAlgorithm {
    pub(crate) fn from_spki(spki: &SubjectPublicKeyInfo<'_>) -> Self {
        if spki.algorithm.algorithm.to_id_string() == OID_ED25519 {
            return Self::Ed25519;
        }
        match spki.parsed() {
            Ok(PublicKey::RSA(rsa)) => Self::Rsa {
                bits: modulus_bits(rsa.modulus),
            },
            Ok(PublicKey::EC(point)) => Self::Ec {
                curve_bits: named_curve_bits(spki)
                    .unwrap_or_else(|| point_bits(point.key_size())),
            },
            _ => Self::Unknown,
        }
    }

    /// Bit length, 0 when unknown.
    pub(crate) const fn key_size(self) -> u32 {
        match self {
            Self::Rsa { bits } => bits,
            Self::Ec { curve_bits } => curve_bits,
            Self::Ed25519 => 256,
            Self::Unknown => 0,
        }
    }
}

/// Length of an unsigned big-endian integer in bits.
fn modulus_bits(modulus: &[u8]) -> u32 {
    let start = modulus.iter().position(|b| *b != 0).unwrap_or(modulus.len());
    let trimmed = &modulus[start..];
    trimmed.first().map_or(0, |first| {
        u32::try_from(trimmed.len() * 8)
            .unwrap_or(0)
            .saturating_sub(first.leading_zeros())
    })
}

fn named_curve_bits(spki: &SubjectPublicKeyInfo<'_>) -> Option<u32> {
    let curve = spki.algorithm.parameters.as_ref()?.as_oid().ok()?.to_id_string();
    NAMED_CURVES
        .iter()
        .find(|(oid, _)| *oid == curve)
        .map(|(_, bits)| *bits)
}

/// Coordinate size rounds P-521 up to a byte boundary.
fn point_bits(bits: usize) -> u32 {
    match bits {
        528 => 521,
        other => u32::try_from(other).unwrap_or(0),
    }
}

fn public_key_algorithm_name(oid: &str) -> String {
    match oid {
        OID_RSA_ENCRYPTION => "RSA".to_string(),
        OID_EC_PUBLIC_KEY => "ECDSA".to_string(),
        OID_ED25519 => "Ed25519".to_string(),
        OID_DSA => "DSA".to_string(),
        other => other.to_string(),
    }
}

fn signature_algorithm_name(oid: &str) -> String {
    SIGNATURE_ALGORITHMS
        .iter()
        .find(|(known, _)| *known == oid)
        .map_or_else(|| oid.to_string(), |(_, name)| (*name).to_string())
}

fn to_utc(time: ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

/// Whole days from `now` to `not_after`, rounded toward negative infinity.
pub(crate) fn days_until(not_after: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (not_after - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

fn dns_names(cert: &X509Certificate<'_>) -> Vec<String> {
    cert.subject_alternative_name()
        .ok()
        .flatten()
        .map(|ext| {
            ext.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some((*dns).to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn uri(name: &GeneralName<'_>) -> Option<String> {
    match name {
        GeneralName::URI(uri) => Some((*uri).to_string()),
        _ => None,
    }
}

fn crl_distribution_points(cert: &X509Certificate<'_>) -> Vec<String> {
    let mut urls = Vec::new();
    for ext in cert.extensions() {
        if let ParsedExtension::CRLDistributionPoints(points) = ext.parsed_extension() {
            for point in &points.points {
                if let Some(DistributionPointName::FullName(names)) = &point.distribution_point {
                    urls.extend(names.iter().filter_map(uri));
                }
            }
        }
    }
    urls
}

fn ocsp_servers(cert: &X509Certificate<'_>) -> Vec<String> {
    let mut urls = Vec::new();
    for ext in cert.extensions() {
        if let ParsedExtension::AuthorityInfoAccess(aia) = ext.parsed_extension() {
            urls.extend(
                aia.accessdescs
                    .iter()
                    .filter(|desc| desc.access_method.to_id_string() == OID_OCSP)
                    .filter_map(|desc| uri(&desc.access_location)),
            );
        }
    }
    urls
}

fn key_usage_labels(cert: &X509Certificate<'_>) -> Vec<String> {
    let Some(ext) = cert.key_usage().ok().flatten() else {
        return Vec::new();
    };
    let usage = ext.value;
    [
        (usage.digital_signature(), "Digital Signature"),
        (usage.non_repudiation(), "Content Commitment"),
        (usage.key_encipherment(), "Key Encipherment"),
        (usage.data_encipherment(), "Data Encipherment"),
        (usage.key_agreement(), "Key Agreement"),
        (usage.key_cert_sign(), "Certificate Signing"),
        (usage.crl_sign(), "CRL Signing"),
    ]
    .into_iter()
    .filter(|(set, _)| *set)
    .map(|(_, label)| label.to_string())
    .collect()
}

fn chain_entry(cert: &X509Certificate<'_>) -> ChainEntry {
    ChainEntry {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        not_before: to_utc(cert.validity().not_before),
        not_after: to_utc(cert.validity().not_after),
        is_ca: cert.is_ca(),
        key_usage: key_usage_labels(cert),
    }
}

/// Build a [`CertificateRecord`] from the peer chain, leaf first.
///
/// Session fields (`tls_version`, `cipher_suite`) and `validation_errors`
/// are left empty for the caller to fill in.
pub(crate) fn record_from_chain(
    domain: &str,
    chain: &[CertificateDer<'_>],
    now: DateTime<Utc>,
) -> ToolboxResult<CertificateRecord> {
    let leaf_der = chain
        .first()
        .ok_or_else(|| ToolboxError::probe_failure(domain, "no certificates presented"))?;
    let (_, leaf) = X509Certificate::from_der(leaf_der.as_ref()).map_err(|e| {
        ToolboxError::probe_failure(domain, format!("certificate parsing failed: {e}"))
    })?;

    let subject = leaf.subject().to_string();
    let issuer = leaf.issuer().to_string();
    let not_before = to_utc(leaf.validity().not_before);
    let not_after = to_utc(leaf.validity().not_after);
    let days_until_expiry = days_until(not_after, now);
    let subject_alt_names = dns_names(&leaf);
    let spki = leaf.public_key();
    let common_name = leaf
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(String::from);

    let certificate_chain = chain
        .iter()
        .enumerate()
        .map(|(position, der)| {
            X509Certificate::from_der(der.as_ref())
                .map(|(_, cert)| chain_entry(&cert))
                .map_err(|e| {
                    warn!("[SSL] {domain}: chain certificate #{position} is unparseable: {e}");
                    ToolboxError::probe_failure(
                        domain,
                        format!("certificate parsing failed at chain position {position}: {e}"),
                    )
                })
        })
        .collect::<ToolboxResult<Vec<_>>>()?;

    Ok(CertificateRecord {
        domain: domain.to_string(),
        is_valid: days_until_expiry > 0 && now > not_before,
        is_self_signed: issuer == subject,
        is_wildcard: subject_alt_names.iter().any(|san| san.starts_with("*.")),
        common_name,
        serial_number: leaf.serial.to_str_radix(16).to_uppercase(),
        signature_algorithm: signature_algorithm_name(
            &leaf.signature_algorithm.algorithm.to_id_string(),
        ),
        public_key_algorithm: public_key_algorithm_name(&spki.algorithm.algorithm.to_id_string()),
        key_size: KeyAlgorithm::from_spki(spki).key_size(),
        version: leaf.version().0 + 1,
        crl_distribution_points: crl_distribution_points(&leaf),
        ocsp_servers: ocsp_servers(&leaf),
        issuer,
        subject,
        not_before,
        not_after,
        days_until_expiry,
        subject_alt_names,
        certificate_chain,
        query_time: now,
        ..Default::default()
    })
}
