//! DNS resolver construction shared by the DNS and IP services.

use std::net::IpAddr;

use hickory_resolver::{
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
    TokioResolver,
};

/// Build a resolver that targets a specific nameserver IP, or falls back to the
/// system configuration when `ns_ip` is `None`.
pub fn build_resolver(ns_ip: Option<IpAddr>) -> TokioResolver {
    if let Some(ns_ip) = ns_ip {
        log::debug!("[DNS] Using nameserver {ns_ip}");
        let config = ResolverConfig::from_parts(
            None,
            vec![],
            NameServerConfigGroup::from_ips_clear(&[ns_ip], 53, true),
        );
        return TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(ResolverOpts::default())
            .build();
    }

    build_system_resolver()
}

/// Build a resolver using the host system DNS configuration (with fallback).
///
/// On Unix/Windows this reads e.g. `/etc/resolv.conf`. If that fails, Hickory's
/// default upstream set is used instead.
pub fn build_system_resolver() -> TokioResolver {
    #[cfg(any(unix, target_os = "windows"))]
    {
        match TokioResolver::builder_tokio() {
            Ok(builder) => return builder.build(),
            Err(e) => {
                log::warn!(
                    "Failed to load system DNS configuration, falling back to defaults: {e}"
                );
            }
        }
    }

    TokioResolver::builder_with_config(
        ResolverConfig::default(),
        TokioConnectionProvider::default(),
    )
    .with_options(ResolverOpts::default())
    .build()
}
