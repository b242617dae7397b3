//! HTTP transport invoker.
//!
//! One uniform request path parameterized by verb, replacing per-verb
//! wrappers. Each call is bound to a fixed timeout and fully drains the
//! response body before returning.

use std::time::Duration;

use reqwest::header::HeaderMap;

use scour::{Config, HttpAddress, Method, ScourError, ScourResult};

/// Budget for one whole HTTP round-trip.
pub const INVOKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Normalized response metadata surfaced in verbose mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedHeaders {
    pub status: String,
    pub protocol: String,
    pub date: String,
    pub content_type: String,
    pub content_length: String,
    pub connection: String,
    pub server: String,
    pub access_control_allow_origin: String,
    pub access_control_allow_credentials: bool,
}

impl NormalizedHeaders {
    /// Normalize the headers scour reports on. `allow-credentials` is
    /// three-valued on the wire; anything but `"true"` collapses to false.
    fn from_parts(status: String, protocol: String, headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        Self {
            status,
            protocol,
            date: get("date"),
            content_type: get("content-type"),
            content_length: get("content-length"),
            connection: get("connection"),
            server: get("server"),
            access_control_allow_origin: get("access-control-allow-origin"),
            access_control_allow_credentials: get("access-control-allow-credentials") == "true",
        }
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Put => reqwest::Method::PUT,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
        Method::Patch => reqwest::Method::PATCH,
    }
}

fn classify(err: reqwest::Error) -> ScourError {
    if err.is_timeout() {
        ScourError::Timeout(INVOKE_TIMEOUT)
    } else {
        ScourError::SendFailure(err.to_string())
    }
}

/// Issue `method` against `addr`, returning the normalized headers and the
/// fully drained body.
pub async fn invoke(
    config: &Config,
    method: Method,
    addr: &HttpAddress,
    body: &[u8],
) -> ScourResult<(NormalizedHeaders, Vec<u8>)> {
    let client = reqwest::Client::builder()
        .timeout(INVOKE_TIMEOUT)
        .build()
        .map_err(|e| ScourError::SendFailure(e.to_string()))?;

    let mut request = client.request(reqwest_method(method), addr.url());
    for (name, value) in &config.headers {
        request = request.header(name, value);
    }
    if method.takes_body() && !body.is_empty() {
        request = request.body(body.to_vec());
    }

    let started = std::time::Instant::now();
    let response = request.send().await.map_err(classify)?;

    let headers = NormalizedHeaders::from_parts(
        response.status().to_string(),
        format!("{}/1.1", addr.scheme()),
        response.headers(),
    );
    if config.verbose {
        tracing::debug!(status = %headers.status, "response headers normalized");
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ScourError::ReceiveFailure(e.to_string()))?
        .to_vec();
    if config.verbose {
        tracing::debug!(len = bytes.len(), elapsed = ?started.elapsed(), "response body drained");
    }

    Ok((headers, bytes))
}
