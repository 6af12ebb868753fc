//! Proxy data models

use crate::proxy::parser::ProxyParser;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder for geo fields that could not be resolved
pub const UNKNOWN: &str = "Unknown";

/// Proxy type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    #[default]
    Unknown,
    Http,
    Https,
    Socks4,
    Socks5,
    Residential,
    Datacenter,
    Mobile,
}

impl ProxyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Unknown => "unknown",
            ProxyType::Http => "http",
            ProxyType::Https => "https",
            ProxyType::Socks4 => "socks4",
            ProxyType::Socks5 => "socks5",
            ProxyType::Residential => "residential",
            ProxyType::Datacenter => "datacenter",
            ProxyType::Mobile => "mobile",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much a working proxy reveals about itself or the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnonymityLevel {
    /// Client IP is visible to the target
    #[default]
    Transparent,
    /// Client IP hidden, proxy presence visible
    Anonymous,
    /// Neither client IP nor proxy usage visible
    Elite,
}

impl AnonymityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnonymityLevel::Transparent => "transparent",
            AnonymityLevel::Anonymous => "anonymous",
            AnonymityLevel::Elite => "elite",
        }
    }
}

impl fmt::Display for AnonymityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unvalidated `host:port` token pulled from a proxy list.
///
/// Every candidate goes through [`crate::proxy::ProxyParser`], including
/// ones read back from a results file, so the host is never empty and the
/// port is digits only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProxyCandidate(String);

impl ProxyCandidate {
    pub(crate) fn from_parts(host: &str, port: &str) -> Self {
        Self(format!("{}:{}", host, port))
    }

    /// The host segment (everything before the first colon)
    pub fn host(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Proxy URL used when routing a request through this candidate
    pub fn url(&self) -> String {
        format!("http://{}", self.0)
    }
}

impl fmt::Display for ProxyCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProxyCandidate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ProxyParser::parse_line(&value).ok_or_else(|| format!("invalid proxy: {:?}", value))
    }
}

impl From<ProxyCandidate> for String {
    fn from(proxy: ProxyCandidate) -> Self {
        proxy.0
    }
}

/// Outcome of probing a single candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyTestResult {
    pub proxy: ProxyCandidate,
    pub is_working: bool,
    pub response_time_ms: f64,
    pub anonymity: AnonymityLevel,
    pub proxy_type: ProxyType,
    pub country: String,
    pub city: String,
    pub organization: String,
    pub tested_at: DateTime<Utc>,
    pub error_message: String,
}

impl ProxyTestResult {
    /// A successful probe
    pub fn working(
        proxy: ProxyCandidate,
        response_time_ms: f64,
        anonymity: AnonymityLevel,
        proxy_type: ProxyType,
    ) -> Self {
        Self {
            is_working: true,
            response_time_ms,
            anonymity,
            proxy_type,
            ..Self::blank(proxy)
        }
    }

    /// A failed probe. An empty message is replaced so the result still
    /// reads as failed.
    pub fn failed(proxy: ProxyCandidate, error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.is_empty() {
            error = String::from("Unknown error");
        }
        Self {
            error_message: error,
            ..Self::blank(proxy)
        }
    }

    fn blank(proxy: ProxyCandidate) -> Self {
        Self {
            proxy,
            is_working: false,
            response_time_ms: 0.0,
            anonymity: AnonymityLevel::default(),
            proxy_type: ProxyType::default(),
            country: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            organization: UNKNOWN.to_string(),
            tested_at: Utc::now(),
            error_message: String::new(),
        }
    }

    pub fn with_location(mut self, country: Option<String>, city: Option<String>) -> Self {
        if let Some(country) = country {
            self.country = country;
        }
        if let Some(city) = city {
            self.city = city;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(s: &str) -> ProxyCandidate {
        ProxyParser::parse_line(s).unwrap()
    }

    #[test]
    fn test_candidate_segments() {
        let proxy = candidate("10.0.0.1:3128");
        assert_eq!(proxy.host(), "10.0.0.1");
        assert_eq!(proxy.url(), "http://10.0.0.1:3128");
        assert_eq!(proxy.to_string(), "10.0.0.1:3128");
    }

    #[test]
    fn test_candidate_deserialize_validates() {
        let proxy: ProxyCandidate = serde_json::from_str(r#""10.0.0.1:3128""#).unwrap();
        assert_eq!(proxy, candidate("10.0.0.1:3128"));

        assert!(serde_json::from_str::<ProxyCandidate>(r#""not a proxy""#).is_err());
        assert!(serde_json::from_str::<ProxyCandidate>(r#""""#).is_err());
        assert!(serde_json::from_str::<ProxyCandidate>(r#"":8080""#).is_err());
    }

    #[test]
    fn test_working_result_has_no_error() {
        let result = ProxyTestResult::working(
            candidate("1.1.1.1:80"),
            120.0,
            AnonymityLevel::Elite,
            ProxyType::Http,
        );
        assert!(result.is_working);
        assert!(result.error_message.is_empty());
        assert_eq!(result.country, UNKNOWN);
        assert_eq!(result.organization, UNKNOWN);
    }

    #[test]
    fn test_failed_result_keeps_defaults() {
        let result = ProxyTestResult::failed(candidate("1.1.1.1:80"), "Timeout");
        assert!(!result.is_working);
        assert_eq!(result.error_message, "Timeout");
        assert_eq!(result.response_time_ms, 0.0);
        assert_eq!(result.anonymity, AnonymityLevel::Transparent);
        assert_eq!(result.proxy_type, ProxyType::Unknown);

        let result = ProxyTestResult::failed(candidate("1.1.1.1:80"), "");
        assert!(!result.error_message.is_empty());
    }

    #[test]
    fn test_result_serializes_enums_as_strings() {
        let result = ProxyTestResult::working(
            candidate("5.5.5.5:8080"),
            42.0,
            AnonymityLevel::Anonymous,
            ProxyType::Residential,
        )
        .with_location(Some("NL".to_string()), None);

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["proxy"], "5.5.5.5:8080");
        assert_eq!(value["anonymity"], "anonymous");
        assert_eq!(value["proxy_type"], "residential");
        assert_eq!(value["country"], "NL");
        assert_eq!(value["city"], UNKNOWN);
        assert!(value["tested_at"].as_str().unwrap().contains('T'));
    }
}
