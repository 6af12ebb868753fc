//! Proxy parser module for turning list lines into candidates

use crate::proxy::models::ProxyCandidate;
use crate::Result;
use anyhow::Context;
use std::fs;
use std::path::Path;

/// Proxy parser for parsing candidates from strings and files
pub struct ProxyParser;

impl ProxyParser {
    /// Parse a single proxy line into a `host:port` candidate
    ///
    /// Blank lines and `#` comments are skipped. Only the first two
    /// colon-separated fields are used, so `IP:PORT:USER:PASS` lines reduce to
    /// `IP:PORT`. Every non-digit character is stripped from the port.
    pub fn parse_line(line: &str) -> Option<ProxyCandidate> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || !line.contains(':') {
            return None;
        }

        let mut parts = line.split(':');
        let host = parts.next()?.trim();
        let port: String = parts
            .next()?
            .trim()
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();

        if host.is_empty() || port.is_empty() {
            return None;
        }

        Some(ProxyCandidate::from_parts(host, &port))
    }

    /// Parse candidates from a string (multiple lines)
    pub fn parse_string(content: &str) -> Vec<ProxyCandidate> {
        content.lines().filter_map(Self::parse_line).collect()
    }

    /// Parse candidates from a file
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<ProxyCandidate>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::parse_string(&content))
    }

    /// Save candidates to a file, one per line, each newline-terminated
    pub fn save_to_file<'a, P, I>(proxies: I, path: P) -> Result<()>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = &'a ProxyCandidate>,
    {
        let path = path.as_ref();
        let content: String = proxies
            .into_iter()
            .map(|p| format!("{}\n", p))
            .collect();

        fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
