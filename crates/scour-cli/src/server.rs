//! Unix-socket record server backing `--create-socket`.
//!
//! Serves the persisted record set over a raw byte protocol: each request is
//! a line shaped `/<verb>[/<argument>]` (an optional `http:`/`https:` prefix
//! is stripped), answered in place on the same connection. Failures are
//! echoed back prefixed `ERROR: `.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use scour::{RecordSet, ScourError, ScourResult};

/// Inbound-read deadline per request; a peer silent past it is treated as
/// dead and the connection is closed.
pub const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(5);

const REQUEST_PAGE: usize = 1024;
const ERROR_PREFIX: &str = "ERROR: ";
const VERB_GET: &str = "get";

/// Listener serving the record set on a unix socket.
#[derive(Debug)]
pub struct RecordServer {
    socket_path: PathBuf,
    listener: UnixListener,
    records: Arc<RecordSet>,
}

impl RecordServer {
    /// Remove any stale socket file at `socket_path` and bind the listener.
    /// A path that exists but is not a socket is refused.
    pub fn bind(socket_path: impl Into<PathBuf>, records: RecordSet) -> ScourResult<Self> {
        let socket_path = socket_path.into();
        cleanup_socket(&socket_path)?;
        if let Some(parent) = socket_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let listener = UnixListener::bind(&socket_path)?;
        info!(
            socket_path = %socket_path.display(),
            records = records.len(),
            "record server bound"
        );
        Ok(Self {
            socket_path,
            listener,
            records: Arc::new(records),
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accept connections until interrupted. The socket file is removed on
    /// interrupt before returning.
    pub async fn run(self) -> ScourResult<()> {
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, removing socket");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            debug!("accepted connection");
                            tokio::spawn(handle_connection(stream, self.records.clone()));
                        }
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                        }
                    }
                }
            }
        }
        std::fs::remove_file(&self.socket_path)?;
        Ok(())
    }
}

/// Remove a stale socket file, refusing to touch anything else.
fn cleanup_socket(path: &Path) -> ScourResult<()> {
    if !path.exists() {
        return Ok(());
    }
    if !scour::locator::is_socket(path) {
        return Err(ScourError::NotASocket(path.display().to_string()));
    }
    std::fs::remove_file(path)?;
    debug!(path = %path.display(), "removed stale socket file");
    Ok(())
}

/// Serve one connection until the peer closes or goes quiet past the read
/// deadline. The stream is exclusively owned by this worker, so response
/// writes cannot interleave across connections.
async fn handle_connection(mut stream: UnixStream, records: Arc<RecordSet>) {
    let mut page = [0u8; REQUEST_PAGE];
    loop {
        let read = match timeout(CLIENT_READ_TIMEOUT, stream.read(&mut page)).await {
            Err(_) => {
                debug!("peer idle past read deadline, closing connection");
                break;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "request read failed");
                break;
            }
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => &page[..n],
        };

        let request = String::from_utf8_lossy(read);
        let request = request.trim();
        debug!(request = %request, "handling request");
        let reply = match handle_request(&records, request) {
            Ok(bytes) => bytes,
            Err(e) => format!("{ERROR_PREFIX}{e}").into_bytes(),
        };

        if let Err(e) = stream.write_all(&reply).await {
            warn!(error = %e, "response write failed");
            break;
        }
    }
}

/// Resolve a `/<verb>[/<argument>]` request line against the record set.
fn handle_request(records: &RecordSet, request: &str) -> ScourResult<Vec<u8>> {
    let request = request
        .strip_prefix("https:")
        .or_else(|| request.strip_prefix("http:"))
        .unwrap_or(request);
    let Some(rest) = request.strip_prefix('/') else {
        return Err(ScourError::InvalidRecordRequest(format!(
            "{request:?} does not start with '/'"
        )));
    };

    let (verb, argument) = match rest.split_once('/') {
        None => (rest, None),
        Some((verb, argument)) => (verb, Some(argument)),
    };

    match verb {
        VERB_GET => match argument {
            None | Some("") => Ok(records.flatten()),
            Some(argument) => {
                let index: usize = argument.parse().map_err(|_| {
                    ScourError::InvalidRecordRequest(format!(
                        "get argument {argument:?} is not a number"
                    ))
                })?;
                records.get(index).map(|record| record.as_bytes().to_vec())
            }
        },
        other => Err(ScourError::InvalidRecordRequest(format!(
            "unknown resource {other:?}"
        ))),
    }
}
