//! Logical certificate checks performed after the untrusted handshake.

use chrono::{DateTime, Utc};

use crate::types::CertificateRecord;

pub const EXPIRED: &str = "certificate has expired";
pub const NOT_YET_VALID: &str = "certificate is not yet valid";
pub const DOMAIN_MISMATCH: &str = "certificate does not match domain";
pub const NO_REVOCATION: &str = "no revocation checking mechanism available";

/// Runs every check independently; an empty result means no issues found.
#[derive(Debug, Clone, Copy, Default)]
pub struct CertificateValidator;

impl CertificateValidator {
    pub fn validate(&self, record: &CertificateRecord, domain: &str) -> Vec<String> {
        self.validate_at(record, domain, Utc::now())
    }

    pub fn validate_at(
        &self,
        record: &CertificateRecord,
        domain: &str,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut errors = Vec::new();
        if now > record.not_after {
            errors.push(EXPIRED.to_string());
        }
        if now < record.not_before {
            errors.push(NOT_YET_VALID.to_string());
        }
        if !matches_domain(record, domain) {
            errors.push(DOMAIN_MISMATCH.to_string());
        }
        if record.crl_distribution_points.is_empty() && record.ocsp_servers.is_empty() {
            errors.push(NO_REVOCATION.to_string());
        }
        errors
    }
}

/// Common name or any SAN, ignoring case.
///
/// A SAN `*.base` covers `base` itself and every name ending in `.base`.
fn matches_domain(record: &CertificateRecord, domain: &str) -> bool {
    let domain = domain.to_ascii_lowercase();
    if record
        .common_name
        .as_deref()
        .is_some_and(|cn| cn.eq_ignore_ascii_case(&domain))
    {
        return true;
    }
    record.subject_alt_names.iter().any(|san| {
        let san = san.to_ascii_lowercase();
        san == domain
            || san
                .strip_prefix("*.")
                .is_some_and(|base| domain == base || domain.ends_with(&format!(".{base}")))
    })
}
