//! TLD → WHOIS server table.

use std::collections::HashMap;

use crate::error::{ToolboxError, ToolboxResult};

/// Built-in candidates, most authoritative first.
const BUILTIN_SERVERS: &[(&str, &[&str])] = &[
    ("com", &["whois.verisign-grs.com", "whois.markmonitor.com"]),
    ("net", &["whois.verisign-grs.com"]),
    ("org", &["whois.pir.org"]),
    ("info", &["whois.afilias.net"]),
    ("biz", &["whois.neulevel.biz"]),
];

/// Used for every TLD without its own entry.
const BUILTIN_DEFAULT: &[&str] = &["whois.iana.org", "whois.internic.net"];

/// Maps a domain's top-level label to the ordered list of servers to ask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoisServerRegistry {
    by_tld: HashMap<String, Vec<String>>,
    default_servers: Vec<String>,
}

impl Default for WhoisServerRegistry {
    fn default() -> Self {
        let mut registry = Self::new(BUILTIN_DEFAULT.iter().map(|s| (*s).to_string()).collect());
        for (tld, servers) in BUILTIN_SERVERS {
            registry = registry.with_tld(tld, servers.iter().map(|s| (*s).to_string()).collect());
        }
        registry
    }
}

impl WhoisServerRegistry {
    /// An empty table that answers every TLD with `default_servers`.
    pub fn new(default_servers: Vec<String>) -> Self {
        Self {
            by_tld: HashMap::new(),
            default_servers,
        }
    }

    /// Register (or replace) the candidate list for `tld`.
    #[must_use]
    pub fn with_tld(mut self, tld: &str, servers: Vec<String>) -> Self {
        self.by_tld.insert(tld.to_ascii_lowercase(), servers);
        self
    }

    pub fn default_servers(&self) -> &[String] {
        &self.default_servers
    }

    /// Candidate servers for `domain`, in the order they should be tried.
    ///
    /// Fails before any I/O when the domain has no `.`.
    pub fn servers_for(&self, domain: &str) -> ToolboxResult<&[String]> {
        let Some((_, tld)) = domain.rsplit_once('.') else {
            return Err(ToolboxError::ValidationError(format!(
                "Invalid domain format: {domain}"
            )));
        };
        Ok(self
            .by_tld
            .get(&tld.to_ascii_lowercase())
            .map_or(self.default_servers.as_slice(), Vec::as_slice))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_tlds_use_their_own_list() {
        let registry = WhoisServerRegistry::default();
        for (tld, expected) in BUILTIN_SERVERS {
            let servers = registry.servers_for(&format!("example.{tld}")).unwrap();
            assert_eq!(servers, *expected, "tld {tld}");
            assert_ne!(servers, registry.default_servers());
        }
    }

    #[test]
    fn test_com_lists_verisign_before_markmonitor() {
        let registry = WhoisServerRegistry::default();
        assert_eq!(
            registry.servers_for("google.com").unwrap(),
            ["whois.verisign-grs.com", "whois.markmonitor.com"]
        );
    }

    #[test]
    fn test_unregistered_tld_gets_default_list() {
        let registry = WhoisServerRegistry::default();
        for domain in ["example.io", "example.co.uk", "example.dev"] {
            assert_eq!(
                registry.servers_for(domain).unwrap(),
                ["whois.iana.org", "whois.internic.net"]
            );
        }
    }

    #[test]
    fn test_tld_lookup_ignores_case() {
        let registry = WhoisServerRegistry::default();
        assert_eq!(registry.servers_for("EXAMPLE.ORG").unwrap(), ["whois.pir.org"]);
    }

    #[test]
    fn test_subdomain_uses_last_label() {
        let registry = WhoisServerRegistry::default();
        assert_eq!(
            registry.servers_for("www.example.net").unwrap(),
            ["whois.verisign-grs.com"]
        );
    }

    #[test]
    fn test_domain_without_dot_is_rejected() {
        let registry = WhoisServerRegistry::default();
        let err = registry.servers_for("localhost").unwrap_err();
        assert!(matches!(err, ToolboxError::ValidationError(_)));
    }

    #[test]
    fn test_custom_table() {
        let registry = WhoisServerRegistry::new(vec!["whois.fallback.test".to_string()])
            .with_tld("test", vec!["a.test".to_string(), "b.test".to_string()]);
        assert_eq!(registry.servers_for("x.test").unwrap(), ["a.test", "b.test"]);
        assert_eq!(registry.servers_for("x.other").unwrap(), ["whois.fallback.test"]);
    }
}
