//! Coarse heuristics applied to a working proxy

use crate::proxy::models::{AnonymityLevel, ProxyType};

/// First-octet prefixes mapped to a proxy type. Anything unmatched is `Http`.
pub const PREFIX_TYPES: &[(&str, ProxyType)] = &[
    ("104.", ProxyType::Datacenter),
    ("172.", ProxyType::Datacenter),
    ("192.", ProxyType::Datacenter),
    ("5.", ProxyType::Residential),
    ("31.", ProxyType::Residential),
    ("185.", ProxyType::Residential),
];

/// Classify anonymity from the origin the echo endpoint saw.
///
/// If the proxy's own address shows up in the origin the proxy is visible,
/// otherwise it is treated as fully opaque. `Transparent` cannot be detected
/// from the origin alone and is never returned.
pub fn anonymity(proxy_host: &str, origin: &str) -> AnonymityLevel {
    if origin.contains(proxy_host) {
        AnonymityLevel::Anonymous
    } else {
        AnonymityLevel::Elite
    }
}

/// Guess the proxy type from its address prefix
pub fn proxy_type(proxy_host: &str) -> ProxyType {
    PREFIX_TYPES
        .iter()
        .find(|(prefix, _)| proxy_host.starts_with(prefix))
        .map(|(_, kind)| *kind)
        .unwrap_or(ProxyType::Http)
}
