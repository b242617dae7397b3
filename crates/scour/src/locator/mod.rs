//! Typed fetch targets.
//!
//! A `Locator` is resolved exactly once, at construction, from the raw
//! command-line target string. The enum is closed over the two supported
//! transports; dispatch sites match exhaustively, so adding a transport is a
//! compile-time-checked change.

mod http;
mod socket;

pub use http::{HttpAddress, Scheme, DEFAULT_HTTPS_PORT, DEFAULT_HTTP_PORT};
pub use socket::{is_socket, SocketAddress};

use crate::error::ScourResult;

/// A resolved fetch target: an HTTP(S) address or a unix-socket locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Http(HttpAddress),
    Socket(SocketAddress),
}

impl Locator {
    /// The raw string this locator was resolved from.
    pub fn as_str(&self) -> &str {
        match self {
            Locator::Http(addr) => addr.as_str(),
            Locator::Socket(addr) => addr.as_str(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.as_str().as_bytes()
    }

    pub fn scheme(&self) -> Option<Scheme> {
        match self {
            Locator::Http(addr) => Some(addr.scheme()),
            Locator::Socket(_) => None,
        }
    }

    pub fn host(&self) -> Option<&str> {
        match self {
            Locator::Http(addr) => Some(addr.host()),
            Locator::Socket(_) => None,
        }
    }

    pub fn port(&self) -> Option<u16> {
        match self {
            Locator::Http(addr) => Some(addr.port()),
            Locator::Socket(_) => None,
        }
    }

    /// The request path for HTTP targets, the socket path for socket targets.
    pub fn path(&self) -> &str {
        match self {
            Locator::Http(addr) => addr.path(),
            Locator::Socket(addr) => addr.socket_path(),
        }
    }

    /// The socket-level resource line; only socket targets carry one.
    pub fn resource(&self) -> Option<&str> {
        match self {
            Locator::Http(_) => None,
            Locator::Socket(addr) => Some(addr.resource()),
        }
    }

    /// Re-run the variant's validation checks.
    ///
    /// HTTP addresses are fully validated at construction; socket addresses
    /// additionally depend on filesystem state that can change between
    /// resolution and use.
    pub fn validate(&self) -> ScourResult<()> {
        match self {
            Locator::Http(_) => Ok(()),
            Locator::Socket(addr) => addr.is_valid(),
        }
    }
}
