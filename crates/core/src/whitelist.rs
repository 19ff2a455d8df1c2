//! Domain whitelist: the access gate in front of rendering and storage.
//!
//! A host is authorized when it equals a whitelisted domain or is a
//! subdomain of one (`host` ends with `"." + domain`). Matching is
//! case-insensitive and ignores a single trailing dot on either side.
//! IP-literal hosts only match an identical whitelist entry.
//!
//! Only `http` and `https` URLs pass; anything unparseable or without a
//! host fails closed.

use std::fmt;

use url::{Host, Url};

use crate::Error;

/// Immutable set of whitelisted domains, built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainWhitelist {
    domains: Vec<String>,
}

impl DomainWhitelist {
    /// Build a whitelist from individual entries.
    ///
    /// Entries are trimmed, lower-cased and stripped of leading/trailing dots.
    /// Empty, duplicate and unparseable entries are dropped.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut domains: Vec<String> = Vec::new();
        for entry in entries {
            match normalize_entry(entry.as_ref()) {
                Some(domain) if !domains.contains(&domain) => domains.push(domain),
                Some(_) => {}
                None if entry.as_ref().trim().is_empty() => {}
                None => tracing::warn!(entry = entry.as_ref(), "ignoring invalid whitelist entry"),
            }
        }
        Self { domains }
    }

    /// Build a whitelist from a comma-separated list (`"example.com,example.org"`).
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Parse `input` and check its host against the whitelist.
    ///
    /// Returns the parsed URL on success. The caller keeps using `input`
    /// itself for the cache key; the parsed form is only for navigation.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidUrl` if the URL does not parse, is not http(s), or has no host
    /// - `Error::NotWhitelisted` if the host is not covered by any entry
    pub fn authorize(&self, input: &str) -> Result<Url, Error> {
        let url = Url::parse(input).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidUrl(format!("{input}: unsupported scheme: {scheme}"))),
        }

        let allowed = match url.host() {
            Some(Host::Domain(host)) => self.allows_domain(host),
            Some(Host::Ipv4(ip)) => self.allows_exact(&ip.to_string()),
            Some(Host::Ipv6(ip)) => self.allows_exact(&ip.to_string()),
            None => return Err(Error::InvalidUrl(format!("{input}: URL has no host"))),
        };

        if allowed { Ok(url) } else { Err(Error::NotWhitelisted(input.to_string())) }
    }

    /// Boolean form of [`authorize`](Self::authorize).
    pub fn is_authorized(&self, input: &str) -> bool {
        self.authorize(input).is_ok()
    }

    fn allows_domain(&self, host: &str) -> bool {
        let host = host.strip_suffix('.').unwrap_or(host).to_ascii_lowercase();
        self.domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.'))
        })
    }

    fn allows_exact(&self, host: &str) -> bool {
        self.domains.iter().any(|domain| domain == host)
    }
}

impl fmt::Display for DomainWhitelist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.domains.join(", "))
    }
}

fn normalize_entry(entry: &str) -> Option<String> {
    let trimmed = entry.trim().trim_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    match Host::parse(trimmed).ok()? {
        Host::Domain(domain) => Some(domain.to_ascii_lowercase()),
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
    }
}
