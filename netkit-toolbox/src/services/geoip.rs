//! GeoIP enrichment backed by MaxMind databases.

use std::net::IpAddr;
use std::path::Path;

use log::{info, warn};
use maxminddb::Reader;

use crate::types::GeoDetails;

/// Source of location and network-owner data for an address.
pub trait GeoIpStore: Send + Sync {
    /// Never fails; problems are reported through `geo_error`.
    fn lookup(&self, ip: IpAddr) -> GeoDetails;
}

/// One optional database: either a reader or the reason it is missing.
enum Database {
    Loaded(Reader<Vec<u8>>),
    Missing(String),
}

impl Database {
    fn open(kind: &str, path: Option<&Path>) -> Self {
        let Some(path) = path else {
            warn!("[GeoIP] {kind} MMDB path not provided, lookups disabled");
            return Self::Missing(format!("{kind} MMDB path not provided"));
        };
        let loaded = std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| Reader::from_source(bytes).map_err(|e| e.to_string()));
        match loaded {
            Ok(reader) => {
                info!("[GeoIP] Loaded {kind} database from {}", path.display());
                Self::Loaded(reader)
            }
            Err(e) => {
                warn!(
                    "[GeoIP] Could not open {kind} database at {}: {e}",
                    path.display()
                );
                Self::Missing(e)
            }
        }
    }
}

/// City and ASN readers, each optional.
pub struct MaxMindGeoIpStore {
    city: Database,
    asn: Database,
}

impl MaxMindGeoIpStore {
    pub fn open(city_path: Option<&Path>, asn_path: Option<&Path>) -> Self {
        Self {
            city: Database::open("City", city_path),
            asn: Database::open("ASN", asn_path),
        }
    }

    /// A store with no databases; every lookup reports both as missing.
    pub fn disabled() -> Self {
        Self::open(None, None)
    }
}

impl GeoIpStore for MaxMindGeoIpStore {
    fn lookup(&self, ip: IpAddr) -> GeoDetails {
        let mut details = GeoDetails::default();
        let mut problems = Vec::new();

        match &self.city {
            Database::Loaded(reader) => {
                if let Err(e) = fill_city(reader, ip, &mut details) {
                    problems.push(format!("City/Country lookup error: {e}"));
                }
            }
            Database::Missing(reason) => {
                problems.push(format!("City/Country DB not loaded: {reason}"));
            }
        }

        match &self.asn {
            Database::Loaded(reader) => {
                if let Err(e) = fill_asn(reader, ip, &mut details) {
                    problems.push(format!("ASN lookup error: {e}"));
                }
            }
            Database::Missing(reason) => {
                problems.push(format!("ASN DB not loaded: {reason}"));
            }
        }

        if !problems.is_empty() {
            details.geo_error = Some(problems.join("; "));
        }
        details
    }
}

fn fill_city(
    reader: &Reader<Vec<u8>>,
    ip: IpAddr,
    details: &mut GeoDetails,
) -> Result<(), maxminddb::MaxMindDbError> {
    let result = reader.lookup(ip)?;
    if !result.has_data() {
        return Ok(());
    }
    let Some(city) = result.decode::<maxminddb::geoip2::City>()? else {
        return Ok(());
    };
    details.country_code = city.country.iso_code.map(str::to_string);
    details.country_name = city.country.names.english.map(str::to_string);
    details.city_name = city.city.names.english.map(str::to_string);
    details.postal_code = city.postal.code.map(str::to_string);
    details.latitude = city.location.latitude;
    details.longitude = city.location.longitude;
    details.time_zone = city.location.time_zone.map(str::to_string);
    Ok(())
}

fn fill_asn(
    reader: &Reader<Vec<u8>>,
    ip: IpAddr,
    details: &mut GeoDetails,
) -> Result<(), maxminddb::MaxMindDbError> {
    let result = reader.lookup(ip)?;
    if !result.has_data() {
        return Ok(());
    }
    if let Some(asn) = result.decode::<maxminddb::geoip2::Asn>()? {
        details.asn = asn.autonomous_system_number;
        details.as_organization = asn.autonomous_system_organization.map(str::to_string);
    }
    Ok(())
}
