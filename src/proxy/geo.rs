//! Optional MaxMind lookup that fills the country and city of working proxies

use crate::Result;
use maxminddb::{geoip2, Reader};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

/// Location fields copied onto a [`crate::proxy::ProxyTestResult`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeoLocation {
    /// ISO country code, or the English country name when the code is missing
    pub country: Option<String>,
    pub city: Option<String>,
}

/// Shared handle on a MaxMind City database
#[derive(Clone)]
pub struct GeoLocator {
    reader: Arc<Reader<Vec<u8>>>,
}

impl GeoLocator {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = Reader::open_readfile(path)?;
        Ok(Self {
            reader: Arc::new(reader),
        })
    }

    /// Locate a proxy host. Hosts that are not IP literals are an error.
    pub fn locate(&self, host: &str) -> Result<GeoLocation> {
        let ip: IpAddr = host.parse()?;
        let city: Option<geoip2::City> = self.reader.lookup(ip)?.decode()?;

        Ok(city
            .map(|city| GeoLocation {
                country: country_label(city.country.iso_code, city.country.names.english),
                city: city.city.names.english.map(String::from),
            })
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for GeoLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoLocator").finish_non_exhaustive()
    }
}

fn country_label(iso_code: Option<&str>, name: Option<&str>) -> Option<String> {
    iso_code.or(name).map(String::from)
}
