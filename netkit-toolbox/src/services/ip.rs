//! IP address classification, reverse DNS and GeoIP.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use hickory_resolver::TokioResolver;
use log::{debug, trace};

use super::geoip::GeoIpStore;
use crate::types::IpInfoResponse;

/// Address class flags, computed without I/O.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Classification {
    is_loopback: bool,
    is_private: bool,
    is_multicast: bool,
    is_link_local_unicast: bool,
    is_global_unicast: bool,
}

/// IPv4-mapped IPv6 addresses are treated as the IPv4 address they carry.
fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
        IpAddr::V4(_) => ip,
    }
}

fn classify_v4(ip: Ipv4Addr) -> Classification {
    let is_link_local_unicast = ip.is_link_local();
    Classification {
        is_loopback: ip.is_loopback(),
        is_private: ip.is_private(),
        is_multicast: ip.is_multicast(),
        is_link_local_unicast,
        is_global_unicast: !(ip.is_unspecified()
            || ip.is_loopback()
            || ip.is_multicast()
            || is_link_local_unicast
            || ip.is_broadcast()),
    }
}

fn classify_v6(ip: Ipv6Addr) -> Classification {
    let first = ip.segments()[0];
    let is_link_local_unicast = first & 0xffc0 == 0xfe80;
    Classification {
        is_loopback: ip.is_loopback(),
        is_private: first & 0xfe00 == 0xfc00,
        is_multicast: ip.is_multicast(),
        is_link_local_unicast,
        is_global_unicast: !(ip.is_unspecified()
            || ip.is_loopback()
            || ip.is_multicast()
            || is_link_local_unicast),
    }
}

/// Classify `ip_text`, then enrich it with PTR names and GeoIP data.
///
/// Invalid input is reported in the response rather than as an error.
pub async fn ip_info(
    resolver: &TokioResolver,
    geoip: &dyn GeoIpStore,
    ip_text: &str,
) -> IpInfoResponse {
    let ip_text = ip_text.trim();
    let mut response = IpInfoResponse {
        ip_address: ip_text.to_string(),
        ..Default::default()
    };

    let Ok(parsed) = ip_text.parse::<IpAddr>() else {
        response.error = Some("Invalid IP address format".to_string());
        return response;
    };
    let ip = canonical(parsed);
    debug!("[IP] Looking up {ip}");

    let (version, class) = match ip {
        IpAddr::V4(v4) => ("IPv4", classify_v4(v4)),
        IpAddr::V6(v6) => ("IPv6", classify_v6(v6)),
    };
    response.is_valid = true;
    response.version = Some(version.to_string());
    response.is_loopback = class.is_loopback;
    response.is_private = class.is_private;
    response.is_multicast = class.is_multicast;
    response.is_link_local_unicast = class.is_link_local_unicast;
    response.is_global_unicast = class.is_global_unicast;

    match resolver.reverse_lookup(ip).await {
        Ok(names) => {
            response.reverse_dns_names = names
                .iter()
                .map(|name| name.to_string().trim_end_matches('.').to_string())
                .collect();
        }
        Err(e) => trace!("[IP] Reverse lookup for {ip} failed: {e}"),
    }

    response.geo = geoip.lookup(ip);
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::GeoDetails;

    fn classify(text: &str) -> Classification {
        match canonical(text.parse().unwrap()) {
            IpAddr::V4(v4) => classify_v4(v4),
            IpAddr::V6(v6) => classify_v6(v6),
        }
    }

    struct FixedGeo;

    impl GeoIpStore for FixedGeo {
        fn lookup(&self, _ip: IpAddr) -> GeoDetails {
            GeoDetails {
                country_code: Some("AU".to_string()),
                asn: Some(13335),
                ..Default::default()
            }
        }
    }

    // ==================== classification tests ====================

    #[test]
    fn test_classify_private_v4() {
        for ip in ["10.1.2.3", "172.16.0.1", "192.168.1.1"] {
            let class = classify(ip);
            assert!(class.is_private, "{ip}");
            assert!(class.is_global_unicast, "{ip}");
        }
        assert!(!classify("172.32.0.1").is_private);
    }

    #[test]
    fn test_classify_loopback() {
        let class = classify("127.0.0.1");
        assert!(class.is_loopback);
        assert!(!class.is_global_unicast);
        assert!(classify("::1").is_loopback);
    }

    #[test]
    fn test_classify_multicast_and_broadcast() {
        let class = classify("224.0.0.1");
        assert!(class.is_multicast);
        assert!(!class.is_global_unicast);
        assert!(!classify("255.255.255.255").is_global_unicast);
        assert!(classify("ff02::1").is_multicast);
    }

    #[test]
    fn test_classify_link_local() {
        assert!(classify("169.254.10.1").is_link_local_unicast);
        assert!(classify("fe80::1").is_link_local_unicast);
        assert!(!classify("fe80::1").is_global_unicast);
    }

    #[test]
    fn test_classify_unique_local_v6_is_private() {
        assert!(classify("fd12:3456::1").is_private);
        assert!(!classify("2001:db8::1").is_private);
        assert!(classify("2001:db8::1").is_global_unicast);
    }

    #[test]
    fn test_mapped_v6_treated_as_v4() {
        assert_eq!(
            canonical("::ffff:192.168.0.1".parse().unwrap()),
            "192.168.0.1".parse::<IpAddr>().unwrap()
        );
        assert!(classify("::ffff:10.0.0.1").is_private);
    }

    #[test]
    fn test_unspecified_is_not_global() {
        assert!(!classify("0.0.0.0").is_global_unicast);
        assert!(!classify("::").is_global_unicast);
    }

    // ==================== ip_info tests ====================

    #[tokio::test]
    async fn test_invalid_ip_reports_error() {
        let resolver = crate::services::resolver::build_system_resolver();
        let response = ip_info(&resolver, &FixedGeo, "999.1.1.1").await;
        assert!(!response.is_valid);
        assert_eq!(response.error.as_deref(), Some("Invalid IP address format"));
        assert_eq!(response.ip_address, "999.1.1.1");
        assert!(response.version.is_none());
        assert_eq!(response.geo, GeoDetails::default());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_ip_info_real() {
        let resolver = crate::services::resolver::build_system_resolver();
        let response = ip_info(&resolver, &FixedGeo, "8.8.8.8").await;
        assert!(response.is_valid);
        assert_eq!(response.version.as_deref(), Some("IPv4"));
        assert!(response.is_global_unicast);
        assert!(response.reverse_dns_names.iter().any(|n| n == "dns.google"));
        assert_eq!(response.geo.country_code.as_deref(), Some("AU"));
    }
}
