//! Line-oriented extraction of registration fields from WHOIS text.
//!
//! Each non-comment line is checked against every rule of [`RULES`]. Date,
//! status and organisation labels may carry a leading qualifier
//! (`Domain Expiration Date`, `Record created`, `Registration status`). Single
//! valued fields keep the last match, multi-valued fields collect every match
//! and are deduplicated once all lines have been read.

use std::sync::LazyLock;

use chrono::Utc;
use log::trace;
use regex::Regex;

use super::date::DateParser;
use crate::types::WhoisRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Registrar,
    CreationDate,
    ExpirationDate,
    UpdatedDate,
    NameServer,
    Status,
    RegistrantOrg,
    RegistrantEmail,
    AdminEmail,
    TechEmail,
}

/// `(field, pattern, multi_valued)`. Capture group 1 is the value.
const RULE_TABLE: &[(Field, &str, bool)] = &[
    (
        Field::Registrar,
        r"(?i)^(?:sponsoring\s+)?registrar(?:\s+name)?:\s*(.+)$",
        false,
    ),
    (
        Field::CreationDate,
        r"(?i)^(?:[\w\s-]*\s)?(?:creation\s+date|created(?:\s+(?:on|date))?|registered(?:\s+on)?|registration\s+(?:date|time)):\s*(.+)$",
        false,
    ),
    (
        Field::ExpirationDate,
        r"(?i)^(?:[\w\s-]*\s)?(?:expiry\s+date|expir(?:y|ation)\s+(?:date|time)|expires(?:\s+on)?|paid-till):\s*(.+)$",
        false,
    ),
    (
        Field::UpdatedDate,
        r"(?i)^(?:updated\s+date|last\s+updated(?:\s+on)?|last[\s-]modified|changed):\s*(.+)$",
        false,
    ),
    (
        Field::NameServer,
        r"(?i)^(?:name\s*servers?|nserver):\s*(\S+)",
        true,
    ),
    (
        Field::Status,
        r"(?i)^(?:(?:[\w\s-]*\s)?status|state):\s*(.+)$",
        true,
    ),
    (
        Field::RegistrantOrg,
        r"(?i)^registrant\s+(?:[\w\s-]*\s)?organi[sz]ation:\s*(.+)$",
        false,
    ),
    (
        Field::RegistrantEmail,
        r"(?i)^registrant\s+(?:contact\s+)?e-?mail:\s*(.+)$",
        false,
    ),
    (
        Field::AdminEmail,
        r"(?i)^admin(?:istrative)?\s+(?:contact\s+)?e-?mail:\s*(.+)$",
        false,
    ),
    (
        Field::TechEmail,
        r"(?i)^tech(?:nical)?\s+(?:contact\s+)?e-?mail:\s*(.+)$",
        false,
    ),
];

struct FieldRule {
    field: Field,
    pattern: Regex,
    multi_valued: bool,
}

static RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    RULE_TABLE
        .iter()
        .filter_map(|(field, pattern, multi_valued)| {
            Regex::new(pattern).ok().map(|pattern| FieldRule {
                field: *field,
                pattern,
                multi_valued: *multi_valued,
            })
        })
        .collect()
});

/// Best-effort WHOIS response parser. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhoisTextParser;

impl WhoisTextParser {
    pub fn parse(&self, domain: &str, raw: &str, server: &str) -> WhoisRecord {
        let mut record = WhoisRecord {
            domain: domain.to_string(),
            whois_server: server.to_string(),
            raw_text: raw.to_string(),
            query_time: Utc::now(),
            ..Default::default()
        };

        for line in raw.lines().map(str::trim) {
            if is_skipped(line) {
                continue;
            }
            for rule in RULES.iter() {
                if let Some(value) = rule
                    .pattern
                    .captures(line)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().trim())
                    .filter(|v| !v.is_empty())
                {
                    trace!(
                        "[WHOIS] {:?} matched (multi={}): {value}",
                        rule.field,
                        rule.multi_valued
                    );
                    apply(&mut record, rule.field, value);
                }
            }
        }

        dedup_in_order(&mut record.name_servers);
        dedup_in_order(&mut record.status);
        record
    }
}

fn is_skipped(line: &str) -> bool {
    line.is_empty() || line.starts_with('%') || line.starts_with('#')
}

fn apply(record: &mut WhoisRecord, field: Field, value: &str) {
    match field {
        Field::Registrar => record.registrar = value.to_string(),
        Field::CreationDate => set_date(&mut record.creation_date, value),
        Field::ExpirationDate => set_date(&mut record.expiration_date, value),
        Field::UpdatedDate => set_date(&mut record.updated_date, value),
        Field::NameServer => record
            .name_servers
            .push(value.trim_end_matches('.').to_lowercase()),
        Field::Status => record.status.push(value.to_string()),
        Field::RegistrantOrg => record.registrant_org = Some(value.to_string()),
        Field::RegistrantEmail => record.registrant_email = Some(value.to_string()),
        Field::AdminEmail => record.admin_email = Some(value.to_string()),
        Field::TechEmail => record.tech_email = Some(value.to_string()),
    }
}

/// Unparseable text leaves an earlier value in place.
fn set_date(slot: &mut Option<chrono::DateTime<Utc>>, value: &str) {
    if let Some(parsed) = DateParser::parse(value) {
        *slot = Some(parsed);
    }
}

fn dedup_in_order(values: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    values.retain(|v| seen.insert(v.clone()));
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const VERISIGN_SAMPLE: &str = "\
   Domain Name: EXAMPLE.COM
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN
   Registrar WHOIS Server: whois.iana.org
   Registrar URL: http://res-dom.iana.org
   Updated Date: 2024-08-14T07:01:34Z
   Creation Date: 1995-08-14T04:00:00Z
   Registry Expiry Date: 2025-08-13T04:00:00Z
   Registrar: RESERVED-Internet Assigned Numbers Authority
   Registrar IANA ID: 376
   Registrar Abuse Contact Email:
   Registrar Abuse Contact Phone:
   Domain Status: clientDeleteProhibited https://icann.org/epp#clientDeleteProhibited
   Domain Status: clientTransferProhibited https://icann.org/epp#clientTransferProhibited
   Name Server: A.IANA-SERVERS.NET
   Name Server: B.IANA-SERVERS.NET
   DNSSEC: signedDelegation
>>> Last update of whois database: 2024-10-01T12:00:00Z <<<

% NOTICE: The expiration date displayed in this record is the date the
# registrar's sponsorship of the domain name registration in the registry is
";

    fn parse(raw: &str) -> WhoisRecord {
        WhoisTextParser.parse("example.com", raw, "whois.verisign-grs.com")
    }

    // ==================== field extraction tests ====================

    #[test]
    fn test_parse_registry_response() {
        let record = parse(VERISIGN_SAMPLE);
        assert_eq!(record.domain, "example.com");
        assert_eq!(record.whois_server, "whois.verisign-grs.com");
        assert_eq!(
            record.registrar,
            "RESERVED-Internet Assigned Numbers Authority"
        );
        assert_eq!(
            record.creation_date,
            Some(Utc.with_ymd_and_hms(1995, 8, 14, 4, 0, 0).unwrap())
        );
        assert_eq!(
            record.expiration_date,
            Some(Utc.with_ymd_and_hms(2025, 8, 13, 4, 0, 0).unwrap())
        );
        assert_eq!(
            record.updated_date,
            Some(Utc.with_ymd_and_hms(2024, 8, 14, 7, 1, 34).unwrap())
        );
        assert_eq!(
            record.name_servers,
            ["a.iana-servers.net", "b.iana-servers.net"]
        );
        assert_eq!(record.status.len(), 2);
        assert!(record.status[0].starts_with("clientDeleteProhibited"));
        assert_eq!(record.raw_text, VERISIGN_SAMPLE);
    }

    #[test]
    fn test_registrar_ignores_related_labels() {
        let record = parse("Registrar URL: http://example.net\nRegistrar WHOIS Server: whois.example.net\nRegistrar IANA ID: 9999");
        assert_eq!(record.registrar, "");
    }

    #[test]
    fn test_contact_fields() {
        let raw = "\
Registrant Organization: Example Org
Registrant Email: owner@example.com
Admin Email: admin@example.com
Tech Email: tech@example.com
";
        let record = parse(raw);
        assert_eq!(record.registrant_org.as_deref(), Some("Example Org"));
        assert_eq!(record.registrant_email.as_deref(), Some("owner@example.com"));
        assert_eq!(record.admin_email.as_deref(), Some("admin@example.com"));
        assert_eq!(record.tech_email.as_deref(), Some("tech@example.com"));
    }

    #[test]
    fn test_ripe_style_labels() {
        let raw = "\
domain:        example.ru
nserver:       ns1.example.ru.
nserver:       ns2.example.ru.
state:         REGISTERED, DELEGATED
created:       2004-03-16T21:00:00Z
paid-till:     2025-03-17T21:00:00Z
";
        let record = parse(raw);
        assert_eq!(record.name_servers, ["ns1.example.ru", "ns2.example.ru"]);
        assert_eq!(record.status, ["REGISTERED, DELEGATED"]);
        assert_eq!(
            record.creation_date,
            Some(Utc.with_ymd_and_hms(2004, 3, 16, 21, 0, 0).unwrap())
        );
        assert_eq!(
            record.expiration_date,
            Some(Utc.with_ymd_and_hms(2025, 3, 17, 21, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_qualified_labels() {
        let raw = "\
Domain Creation Date: 2001-02-03
Domain Expiration Date: 2030-02-03
Registration status: active
Registrant Contact Organization: Acme Inc
";
        let record = parse(raw);
        assert_eq!(
            record.creation_date,
            Some(Utc.with_ymd_and_hms(2001, 2, 3, 0, 0, 0).unwrap())
        );
        assert_eq!(
            record.expiration_date,
            Some(Utc.with_ymd_and_hms(2030, 2, 3, 0, 0, 0).unwrap())
        );
        assert_eq!(record.status, ["active"]);
        assert_eq!(record.registrant_org.as_deref(), Some("Acme Inc"));
    }

    #[test]
    fn test_record_created_label() {
        let record = parse("Record created: 2010-05-06\nRecord expires on: 2031-05-06");
        assert_eq!(
            record.creation_date,
            Some(Utc.with_ymd_and_hms(2010, 5, 6, 0, 0, 0).unwrap())
        );
        assert_eq!(
            record.expiration_date,
            Some(Utc.with_ymd_and_hms(2031, 5, 6, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_qualifier_does_not_cross_fields() {
        let raw = "\
Registrar Registration Expiration Date: 2030-02-03
Registrant State/Province: CA
Registrar Abuse Contact Email: abuse@example.net
";
        let record = parse(raw);
        assert!(record.creation_date.is_none());
        assert_eq!(
            record.expiration_date,
            Some(Utc.with_ymd_and_hms(2030, 2, 3, 0, 0, 0).unwrap())
        );
        assert!(record.status.is_empty());
        assert!(record.admin_email.is_none());
    }

    #[test]
    fn test_name_server_keeps_hostname_only() {
        let record = parse("Name Server: NS1.EXAMPLE.COM 192.0.2.1");
        assert_eq!(record.name_servers, ["ns1.example.com"]);
    }

    // ==================== overwrite and dedup tests ====================

    #[test]
    fn test_duplicate_name_servers_listed_once() {
        let raw = "Name Server: ns1.example.com\nName Server: ns1.example.com\nName Server: ns2.example.com";
        let record = parse(raw);
        assert_eq!(record.name_servers, ["ns1.example.com", "ns2.example.com"]);
    }

    #[test]
    fn test_dedup_after_lowercasing() {
        let record = parse("Name Server: NS1.EXAMPLE.COM\nName Server: ns1.example.com");
        assert_eq!(record.name_servers, ["ns1.example.com"]);
    }

    #[test]
    fn test_duplicate_status_listed_once_in_first_seen_order() {
        let raw = "Status: ok\nDomain Status: active\nStatus: ok";
        let record = parse(raw);
        assert_eq!(record.status, ["ok", "active"]);
    }

    #[test]
    fn test_last_single_value_wins() {
        let record = parse("Registrar: First Registrar\nRegistrar: Second Registrar");
        assert_eq!(record.registrar, "Second Registrar");
    }

    #[test]
    fn test_unparseable_date_keeps_previous_value() {
        let raw = "Creation Date: 2001-02-03\nCreation Date: sometime in 1999";
        let record = parse(raw);
        assert_eq!(
            record.creation_date,
            Some(Utc.with_ymd_and_hms(2001, 2, 3, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_unparseable_date_is_absent() {
        let record = parse("Expiry Date: before Aug-1996");
        assert_eq!(record.expiration_date, None);
    }

    // ==================== skipped line tests ====================

    #[test]
    fn test_comment_lines_never_match() {
        let raw = "% This is a comment\n% Registrar: Hidden\n# Name Server: ns.hidden.example\n#Status: hidden";
        let record = parse(raw);
        assert_eq!(record.registrar, "");
        assert!(record.name_servers.is_empty());
        assert!(record.status.is_empty());
    }

    #[test]
    fn test_empty_input_gives_empty_record() {
        let record = parse("");
        assert_eq!(record.registrar, "");
        assert!(record.creation_date.is_none());
        assert!(record.name_servers.is_empty());
    }

    #[test]
    fn test_rule_table_compiles() {
        assert_eq!(RULES.len(), RULE_TABLE.len());
    }
}
