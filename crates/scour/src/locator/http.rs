//! HTTP(S) address resolution.
//!
//! Accepted forms: `scheme://host[:port][/path]` with scheme http or https,
//! or a bare `host.domain[...]` which defaults to https. Bracketed IPv6
//! literals carry extra colons and are rejected outright.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Config;
use crate::error::{ScourError, ScourResult};

pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// Bare hostnames that may be defaulted to https when no scheme is given.
static HOSTNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+(\.[A-Za-z0-9]+)+.*$").unwrap());

/// Supported URL schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => DEFAULT_HTTP_PORT,
            Scheme::Https => DEFAULT_HTTPS_PORT,
        }
    }

    fn parse(s: &str) -> ScourResult<Self> {
        match s {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(ScourError::UnsupportedScheme(other.to_string())),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved HTTP(S) target address.
///
/// Construction performs the full resolution, so a value of this type is
/// always internally consistent: the port is populated (explicit or scheme
/// default) and the path is never empty (`"/"` when absent, stored without
/// its leading slash otherwise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpAddress {
    raw: String,
    scheme: Scheme,
    host: String,
    port: u16,
    path: String,
}

impl HttpAddress {
    /// Resolve a raw target string into an address.
    pub fn resolve(raw: &str, config: &Config) -> ScourResult<Self> {
        let prefixed;
        let target = if raw.contains(':') {
            raw
        } else {
            if !HOSTNAME_REGEX.is_match(raw) {
                if config.verbose {
                    tracing::debug!(raw, "bare hostname rejected");
                }
                return Err(ScourError::InvalidHostname(raw.to_string()));
            }
            // A hostname without an explicit scheme is treated as https.
            prefixed = format!("https://{raw}");
            &prefixed
        };

        let segments: Vec<&str> = target.split(':').collect();
        let (scheme, host, port, path) = match segments.len() {
            2 => {
                let scheme = Scheme::parse(segments[0])?;
                let (host, path) = split_host_path(segments[1]);
                (scheme, host, scheme.default_port(), path)
            }
            3 => {
                let scheme = Scheme::parse(segments[0])?;
                let host = segments[1].trim_start_matches('/').to_string();
                let (port_str, path) = split_port_path(segments[2]);
                let port = port_str
                    .parse::<u16>()
                    .map_err(|_| ScourError::InvalidPort(port_str.to_string()))?;
                (scheme, host, port, path)
            }
            _ => {
                if config.verbose {
                    tracing::debug!(raw, "multi-colon target rejected");
                }
                return Err(ScourError::UnsupportedAddressFamily(raw.to_string()));
            }
        };

        let addr = HttpAddress {
            raw: target.to_string(),
            scheme,
            host,
            port,
            path,
        };
        if config.verbose {
            tracing::debug!(
                scheme = %addr.scheme,
                host = %addr.host,
                port = addr.port,
                path = %addr.path,
                "resolved http target"
            );
        }
        Ok(addr)
    }

    /// The raw (possibly scheme-prefixed) string this address was resolved from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.raw.as_bytes()
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Canonical `scheme://host:port/path` form for the HTTP client.
    pub fn url(&self) -> String {
        if self.path == "/" {
            format!("{}://{}:{}/", self.scheme, self.host, self.port)
        } else {
            format!("{}://{}:{}/{}", self.scheme, self.host, self.port, self.path)
        }
    }
}

/// Split a `[/]host[/path...]` remainder into host and path, defaulting the
/// path to `/`.
fn split_host_path(segment: &str) -> (String, String) {
    let trimmed = segment.trim_start_matches('/');
    match trimmed.split_once('/') {
        None => (trimmed.to_string(), "/".to_string()),
        Some((host, rest)) => (host.to_string(), normalize_path(rest)),
    }
}

/// Split a `port[/path...]` remainder into port text and path.
fn split_port_path(segment: &str) -> (&str, String) {
    match segment.split_once('/') {
        None => (segment, "/".to_string()),
        Some((port, rest)) => (port, normalize_path(rest)),
    }
}

fn normalize_path(rest: &str) -> String {
    if rest.is_empty() {
        "/".to_string()
    } else {
        rest.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn resolves_host_and_path_with_default_http_port() {
        let addr = HttpAddress::resolve("http://eu.httpbin.org/get", &config()).unwrap();
        assert_eq!(addr.scheme(), Scheme::Http);
        assert_eq!(addr.host(), "eu.httpbin.org");
        assert_eq!(addr.port(), 80);
        assert_eq!(addr.path(), "get");
    }

    #[test]
    fn resolves_explicit_port() {
        let addr = HttpAddress::resolve("http://eu.httpbin.org:4040/get", &config()).unwrap();
        assert_eq!(addr.scheme(), Scheme::Http);
        assert_eq!(addr.host(), "eu.httpbin.org");
        assert_eq!(addr.port(), 4040);
        assert_eq!(addr.path(), "get");
    }

    #[test]
    fn https_defaults_to_port_443() {
        let addr = HttpAddress::resolve("https://example.com/anything", &config()).unwrap();
        assert_eq!(addr.port(), 443);
    }

    #[test]
    fn missing_path_defaults_to_slash() {
        let addr = HttpAddress::resolve("http://example.com", &config()).unwrap();
        assert_eq!(addr.path(), "/");

        let addr = HttpAddress::resolve("http://example.com:8080", &config()).unwrap();
        assert_eq!(addr.path(), "/");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn multi_segment_paths_are_rejoined() {
        let addr = HttpAddress::resolve("http://example.com/a/b/c", &config()).unwrap();
        assert_eq!(addr.path(), "a/b/c");
    }

    #[test]
    fn bare_hostname_defaults_to_https() {
        let addr = HttpAddress::resolve("eu.httpbin.org/get", &config()).unwrap();
        assert_eq!(addr.scheme(), Scheme::Https);
        assert_eq!(addr.port(), 443);
        assert_eq!(addr.host(), "eu.httpbin.org");
        assert_eq!(addr.path(), "get");
        assert_eq!(addr.as_str(), "https://eu.httpbin.org/get");
    }

    #[test]
    fn invalid_bare_hostname_is_rejected() {
        let err = HttpAddress::resolve("localhost", &config()).unwrap_err();
        assert!(matches!(err, ScourError::InvalidHostname(_)));
    }

    #[test]
    fn bracketed_ipv6_literal_is_unsupported() {
        let err = HttpAddress::resolve(
            "http://[2001:0db8:85a3:0000:0000:8a2e:0370:7334]/",
            &config(),
        )
        .unwrap_err();
        assert!(matches!(err, ScourError::UnsupportedAddressFamily(_)));
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let err = HttpAddress::resolve("ftp://example.com/file", &config()).unwrap_err();
        assert!(matches!(err, ScourError::UnsupportedScheme(s) if s == "ftp"));
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let err = HttpAddress::resolve("http://example.com:abc/get", &config()).unwrap_err();
        assert!(matches!(err, ScourError::InvalidPort(p) if p == "abc"));
    }

    #[test]
    fn resolution_is_idempotent() {
        let first = HttpAddress::resolve("http://eu.httpbin.org:4040/get", &config()).unwrap();
        let second = HttpAddress::resolve("http://eu.httpbin.org:4040/get", &config()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn url_reconstructs_canonical_form() {
        let addr = HttpAddress::resolve("http://example.com/a/b", &config()).unwrap();
        assert_eq!(addr.url(), "http://example.com:80/a/b");

        let addr = HttpAddress::resolve("https://example.com", &config()).unwrap();
        assert_eq!(addr.url(), "https://example.com:443/");
    }
}
