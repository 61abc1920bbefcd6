//! DNS 查询模块

use std::collections::BTreeMap;

use futures::future::join_all;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioResolver;
use log::{debug, trace};

use crate::types::{DnsLookupResponse, DnsRecord, DnsRecordKind};

/// Split raw type names into supported kinds (deduplicated, in request order)
/// and per-name errors for the rest. No names means the default set.
fn plan_kinds(record_types: &[String]) -> (Vec<DnsRecordKind>, BTreeMap<String, String>) {
    let mut kinds = Vec::new();
    let mut errors = BTreeMap::new();

    for raw in record_types.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        match raw.parse::<DnsRecordKind>() {
            Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Ok(_) => {}
            Err(msg) => {
                errors.insert(raw.to_string(), msg);
            }
        }
    }

    if kinds.is_empty() && errors.is_empty() {
        kinds.extend(DnsRecordKind::DEFAULT_SET);
    }
    (kinds, errors)
}

/// Query every requested type concurrently.
///
/// Types without answers are left out of `records`; resolver errors are
/// reported per type in `errors`.
pub async fn dns_lookup(
    resolver: &TokioResolver,
    domain: &str,
    record_types: &[String],
) -> DnsLookupResponse {
    let (kinds, mut errors) = plan_kinds(record_types);
    debug!("[DNS] Looking up {domain} for {kinds:?}");

    let results = join_all(
        kinds
            .iter()
            .map(|kind| async move { (*kind, lookup_kind(resolver, domain, *kind).await) }),
    )
    .await;

    let mut records = BTreeMap::new();
    for (kind, result) in results {
        match result {
            Ok(found) if !found.is_empty() => {
                trace!("[DNS] {kind} for {domain}: {} record(s)", found.len());
                records.insert(kind.to_string(), found);
            }
            Ok(_) => {}
            Err(e) => {
                trace!("[DNS] {kind} for {domain} failed: {e}");
                errors.insert(kind.to_string(), e);
            }
        }
    }

    DnsLookupResponse {
        domain: domain.to_string(),
        records,
        errors,
    }
}

fn host(name: &impl ToString) -> String {
    name.to_string().trim_end_matches('.').to_string()
}

async fn lookup_kind(
    resolver: &TokioResolver,
    domain: &str,
    kind: DnsRecordKind,
) -> Result<Vec<DnsRecord>, String> {
    let record_type = match kind {
        DnsRecordKind::A => RecordType::A,
        DnsRecordKind::Aaaa => RecordType::AAAA,
        DnsRecordKind::Mx => RecordType::MX,
        DnsRecordKind::Cname => RecordType::CNAME,
        DnsRecordKind::Txt => RecordType::TXT,
        DnsRecordKind::Ns => RecordType::NS,
    };
    let response = resolver
        .lookup(domain, record_type)
        .await
        .map_err(|e| e.to_string())?;
    Ok(response
        .record_iter()
        .filter_map(|record| to_dns_record(kind, record.data(), Some(record.ttl())))
        .collect())
}

/// Answers of a different type (e.g. the CNAME chain of an A query) are skipped.
fn to_dns_record(kind: DnsRecordKind, data: &RData, ttl: Option<u32>) -> Option<DnsRecord> {
    let (value, priority) = match (kind, data) {
        (DnsRecordKind::A, RData::A(ip)) => (ip.to_string(), None),
        (DnsRecordKind::Aaaa, RData::AAAA(ip)) => (ip.to_string(), None),
        (DnsRecordKind::Mx, RData::MX(mx)) => (host(mx.exchange()), Some(mx.preference())),
        (DnsRecordKind::Cname, RData::CNAME(cname)) => (host(&cname.0), None),
        (DnsRecordKind::Ns, RData::NS(ns)) => (host(&ns.0), None),
        (DnsRecordKind::Txt, RData::TXT(txt)) => (
            txt.iter()
                .map(|data| String::from_utf8_lossy(data).into_owned())
                .collect::<String>(),
            None,
        ),
        _ => return None,
    };
    Some(DnsRecord {
        record_type: kind.to_string(),
        value,
        priority,
        ttl,
    })
}
