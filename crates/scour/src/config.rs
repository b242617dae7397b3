//! Invocation configuration.
//!
//! A `Config` is built once from parsed flags and passed by reference into
//! every resolver and console constructor; core logic never reads ambient
//! process-wide state.

use std::fmt;
use std::str::FromStr;

use crate::error::{ScourError, ScourResult};

/// Transport selected by the flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Http,
    Socket,
}

/// HTTP verbs scour can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }

    /// True for verbs that carry a request body.
    pub fn takes_body(&self) -> bool {
        matches!(self, Method::Put | Method::Post | Method::Patch)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ScourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "PUT" => Ok(Method::Put),
            "POST" => Ok(Method::Post),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            _ => Err(ScourError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Immutable flag values for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Verbose mode: debug diagnostics plus the console send/receive echo.
    pub verbose: bool,
    /// HTTP verb for network-mode requests.
    pub method: Method,
    /// Request body data.
    pub data: String,
    /// Custom request headers, already split into name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Connect through a unix domain socket instead of the network.
    pub unix_socket: bool,
    /// Interactive console mode for socket connections.
    pub interactive: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose: false,
            method: Method::Get,
            data: String::new(),
            headers: Vec::new(),
            unix_socket: false,
            interactive: false,
        }
    }
}

impl Config {
    /// Resolve the transport for this invocation.
    pub fn mode(&self) -> Mode {
        if self.unix_socket {
            Mode::Socket
        } else {
            Mode::Http
        }
    }
}

/// Parse one `-H` flag value of the form `name: value`.
pub fn parse_header(raw: &str) -> ScourResult<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| ScourError::MalformedHeader(raw.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ScourError::MalformedHeader(raw.to_string()));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
