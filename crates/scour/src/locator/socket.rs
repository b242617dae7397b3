//! Unix-socket locator resolution.
//!
//! A socket locator is a two-token string, `"<socket-path> <resource>"`. The
//! resource keeps an HTTP shape (`http:/images/json`) and is written verbatim
//! as the socket-level request line.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Config;
use crate::error::{ScourError, ScourResult};

static RESOURCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?:)(/[^/\s]+)+$").unwrap());

const LOCATOR_DELIM: char = ' ';

/// A resolved unix-socket target: the socket to dial plus the resource line
/// to send over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketAddress {
    raw: String,
    socket_path: String,
    resource: String,
}

impl SocketAddress {
    /// Resolve a `"<socket-path> <resource>"` pair.
    ///
    /// A single token is accepted as a bare socket path with an empty
    /// resource; `is_valid` rejects it before a session starts. More than two
    /// tokens is malformed.
    pub fn resolve(raw: &str, config: &Config) -> ScourResult<Self> {
        let tokens: Vec<&str> = raw.split(LOCATOR_DELIM).collect();
        let (socket_path, resource) = match tokens.len() {
            1 => (tokens[0].to_string(), String::new()),
            2 => (tokens[0].to_string(), tokens[1].to_string()),
            _ => {
                if config.verbose {
                    tracing::debug!(raw, "socket locator has too many tokens");
                }
                return Err(ScourError::MalformedLocator(raw.to_string()));
            }
        };

        let addr = SocketAddress {
            raw: raw.to_string(),
            socket_path,
            resource,
        };
        if config.verbose {
            tracing::debug!(
                socket_path = %addr.socket_path,
                resource = %addr.resource,
                "resolved socket target"
            );
        }
        Ok(addr)
    }

    /// Check that the socket path names a live unix socket and the resource
    /// has the expected shape. Side-effect free and callable repeatedly.
    pub fn is_valid(&self) -> ScourResult<()> {
        if !is_socket(Path::new(&self.socket_path)) {
            return Err(ScourError::NotASocket(self.socket_path.clone()));
        }
        if !RESOURCE_REGEX.is_match(&self.resource) {
            return Err(ScourError::InvalidResource(self.resource.clone()));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.raw.as_bytes()
    }

    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

/// True when `path` stats to an existing socket-type filesystem entry.
/// A stat failure (missing file included) counts as not-a-socket.
pub fn is_socket(path: &Path) -> bool {
    use std::os::unix::fs::FileTypeExt;

    std::fs::metadata(path)
        .map(|meta| meta.file_type().is_socket())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn two_token_locator_round_trips() {
        let addr =
            SocketAddress::resolve("/var/run/docker.sock http:/images/json", &config()).unwrap();
        assert_eq!(addr.socket_path(), "/var/run/docker.sock");
        assert_eq!(addr.resource(), "http:/images/json");
        assert_eq!(addr.as_str(), "/var/run/docker.sock http:/images/json");
    }

    #[test]
    fn single_token_leaves_resource_empty() {
        let addr = SocketAddress::resolve("/var/run/docker.sock", &config()).unwrap();
        assert_eq!(addr.socket_path(), "/var/run/docker.sock");
        assert_eq!(addr.resource(), "");
    }

    #[test]
    fn three_tokens_are_malformed() {
        let err = SocketAddress::resolve("a.sock http:/x extra", &config()).unwrap_err();
        assert!(matches!(err, ScourError::MalformedLocator(_)));
    }

    #[test]
    fn missing_socket_fails_validation_regardless_of_resource() {
        let addr = SocketAddress::resolve("/no/such/file.sock http:/images/json", &config())
            .unwrap();
        assert!(matches!(
            addr.is_valid().unwrap_err(),
            ScourError::NotASocket(_)
        ));
    }

    #[test]
    fn regular_file_is_not_a_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        std::fs::write(&path, b"not a socket").unwrap();

        let raw = format!("{} http:/images/json", path.display());
        let addr = SocketAddress::resolve(&raw, &config()).unwrap();
        assert!(matches!(
            addr.is_valid().unwrap_err(),
            ScourError::NotASocket(_)
        ));
    }

    #[test]
    fn live_socket_with_shaped_resource_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.sock");
        let _listener = std::os::unix::net::UnixListener::bind(&path).unwrap();

        let raw = format!("{} http:/images/json", path.display());
        let addr = SocketAddress::resolve(&raw, &config()).unwrap();
        addr.is_valid().unwrap();
        // repeatable
        addr.is_valid().unwrap();
    }

    #[test]
    fn malformed_resource_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.sock");
        let _listener = std::os::unix::net::UnixListener::bind(&path).unwrap();

        for bad in ["images/json", "http://images", "http:/", "ftp:/images"] {
            let raw = format!("{} {bad}", path.display());
            let addr = SocketAddress::resolve(&raw, &config()).unwrap();
            assert!(
                matches!(addr.is_valid().unwrap_err(), ScourError::InvalidResource(_)),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn empty_resource_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.sock");
        let _listener = std::os::unix::net::UnixListener::bind(&path).unwrap();

        let addr = SocketAddress::resolve(&path.display().to_string(), &config()).unwrap();
        assert!(matches!(
            addr.is_valid().unwrap_err(),
            ScourError::InvalidResource(_)
        ));
    }
}
