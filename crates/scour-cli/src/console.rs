//! Interactive and one-shot console sessions over a unix socket.
//!
//! A `Console` owns one live connection and runs exactly one session.
//! Requests are raw bytes written to the socket with no framing; responses
//! are read until the peer closes or the per-request deadline fires. In
//! interactive mode each operator line is one request, and the session ends
//! on `:close`, an empty line, or end-of-input.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};
use uuid::Uuid;

use scour::{Config, ScourError, ScourResult, SocketAddress};

/// Sentinel line that ends an interactive session.
pub const SESSION_CLOSE: &str = ":close";

/// Deadline for one send+receive turn.
pub const TURN_TIMEOUT: Duration = Duration::from_secs(2);

/// Send retries allowed per request once the operator confirms.
const RETRY_LIMIT: u32 = 5;

/// Malformed confirmation answers tolerated before retry is disabled.
const PROMPT_RETRY_CAP: u32 = 5;

/// Receive buffer page size.
const RECV_PAGE: usize = 1024;

/// Per-request retry budget. Reset for every logical request; never shared
/// across requests.
#[derive(Debug, Clone, Copy)]
struct RetryState {
    attempts: u32,
    limit: u32,
}

impl RetryState {
    fn new(limit: u32) -> Self {
        Self { attempts: 0, limit }
    }

    /// Consume one attempt; false once the budget is spent.
    fn bump(&mut self) -> bool {
        self.attempts += 1;
        self.attempts <= self.limit
    }
}

/// Ordered sent/received byte fragments for one session.
#[derive(Debug, Default)]
pub struct Transcript {
    fragments: Vec<Vec<u8>>,
}

impl Transcript {
    fn record(&mut self, fragment: &[u8]) {
        self.fragments.push(fragment.to_vec());
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &[Vec<u8>] {
        &self.fragments
    }

    /// Fragments in send/receive order, newline-separated.
    pub fn flatten(&self) -> Vec<u8> {
        let mut flat = Vec::new();
        for fragment in &self.fragments {
            flat.extend_from_slice(fragment);
            flat.push(b'\n');
        }
        flat
    }
}

/// What a finished session hands back. The transcript accumulated before a
/// failure is preserved, never discarded.
#[derive(Debug)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    pub transcript: Transcript,
    pub error: Option<ScourError>,
}

/// One console session over a live unix-socket connection.
pub struct Console<R> {
    config: Config,
    locator: SocketAddress,
    conn: UnixStream,
    input: R,
    turn_gate: Arc<Mutex<()>>,
}

impl Console<BufReader<Stdin>> {
    /// Dial the locator's socket, reading interactive input from stdin.
    pub async fn connect(config: Config, locator: SocketAddress) -> ScourResult<Self> {
        let conn = UnixStream::connect(locator.socket_path()).await?;
        Ok(Self::with_input(
            config,
            locator,
            conn,
            BufReader::new(tokio::io::stdin()),
        ))
    }
}

impl<R: AsyncBufRead + Unpin> Console<R> {
    /// Build a console over an established connection and an injected input
    /// stream. The input stream feeds both interactive request lines and the
    /// retry confirmation prompt.
    pub fn with_input(config: Config, locator: SocketAddress, conn: UnixStream, input: R) -> Self {
        Self {
            config,
            locator,
            conn,
            input,
            turn_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Run the session to completion.
    pub async fn run(mut self) -> SessionOutcome {
        let session_id = Uuid::new_v4();
        let mut transcript = Transcript::default();
        let error = if self.config.interactive {
            self.interactive(session_id, &mut transcript).await.err()
        } else {
            self.one_shot(&mut transcript).await.err()
        };
        SessionOutcome {
            session_id,
            transcript,
            error,
        }
    }

    /// Send the locator's resource once and collect the response.
    async fn one_shot(&mut self, transcript: &mut Transcript) -> ScourResult<()> {
        let resource = self.locator.resource().as_bytes().to_vec();
        self.turn(&resource, transcript).await?;
        Ok(())
    }

    /// Read operator lines as successive requests until the close sentinel,
    /// an empty line, or end-of-input. Any send/receive error ends the
    /// session with the transcript accumulated so far.
    async fn interactive(
        &mut self,
        session_id: Uuid,
        transcript: &mut Transcript,
    ) -> ScourResult<()> {
        eprintln!("Starting console session: {session_id}");
        let mut line = String::new();
        loop {
            line.clear();
            let read = self.input.read_line(&mut line).await?;
            if read == 0 {
                // End-of-input closes the session cleanly.
                break;
            }
            let request = line.trim_end_matches(['\r', '\n']);
            if request.is_empty() || request == SESSION_CLOSE {
                break;
            }
            let request = request.as_bytes().to_vec();
            let response = self.turn(&request, transcript).await?;
            println!("< {}", String::from_utf8_lossy(&response));
        }
        Ok(())
    }

    /// One send+receive turn under the session turn gate and a fresh
    /// deadline. The gate is held from before the write until the matching
    /// read completes, so turns can never interleave on the connection.
    async fn turn(&mut self, payload: &[u8], transcript: &mut Transcript) -> ScourResult<Vec<u8>> {
        let _turn = self.turn_gate.clone().lock_owned().await;
        let deadline = Instant::now() + TURN_TIMEOUT;
        self.send(payload, deadline).await?;
        transcript.record(payload);
        let response = self.receive(deadline).await?;
        transcript.record(&response);
        Ok(response)
    }

    /// Write the payload, retrying on failure in interactive mode when the
    /// operator confirms, up to the per-request retry budget. Non-interactive
    /// sessions never retry.
    async fn send(&mut self, payload: &[u8], deadline: Instant) -> ScourResult<()> {
        if self.config.verbose {
            eprintln!(
                ">> sending to {}: {}",
                self.locator.socket_path(),
                String::from_utf8_lossy(payload)
            );
        }
        let mut retry = RetryState::new(RETRY_LIMIT);
        loop {
            let err = match timeout_at(deadline, self.conn.write_all(payload)).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => ScourError::SendFailure(e.to_string()),
                Err(_) => ScourError::Timeout(TURN_TIMEOUT),
            };
            tracing::debug!(error = %err, attempts = retry.attempts, "send attempt failed");
            if !self.config.interactive || !self.confirm_retry(payload).await {
                return Err(err);
            }
            if !retry.bump() {
                return Err(ScourError::RetryLimitExceeded(retry.limit));
            }
        }
    }

    /// Ask the operator whether to resend. Malformed answers re-prompt, up to
    /// a cap after which retry is disabled for this request. End-of-input and
    /// read errors decline.
    async fn confirm_retry(&mut self, payload: &[u8]) -> bool {
        let mut answer = String::new();
        let mut malformed = 0u32;
        loop {
            eprintln!(
                "? resend {}? answer y/yes or n/no",
                String::from_utf8_lossy(payload)
            );
            answer.clear();
            match self.input.read_line(&mut answer).await {
                Ok(0) | Err(_) => return false,
                Ok(_) => {}
            }
            match answer.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return true,
                "n" | "no" => return false,
                other => {
                    malformed += 1;
                    if malformed >= PROMPT_RETRY_CAP {
                        eprintln!("invalid response limit reached, disabling retry");
                        return false;
                    }
                    eprintln!("response {other:?} unrecognized");
                }
            }
        }
    }

    /// Accumulate response bytes until the peer closes or the deadline fires.
    /// Bytes already received when the deadline fires are the response; an
    /// empty buffer at the deadline is a timeout.
    async fn receive(&mut self, deadline: Instant) -> ScourResult<Vec<u8>> {
        let mut buf = Vec::new();
        let mut page = [0u8; RECV_PAGE];
        loop {
            match timeout_at(deadline, self.conn.read(&mut page)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    if self.config.verbose {
                        eprintln!("<< {}", String::from_utf8_lossy(&page[..n]));
                    }
                    buf.extend_from_slice(&page[..n]);
                }
                Ok(Err(e)) => return Err(ScourError::ReceiveFailure(e.to_string())),
                Err(_) if buf.is_empty() => return Err(ScourError::Timeout(TURN_TIMEOUT)),
                Err(_) => break,
            }
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn socket_config(interactive: bool) -> Config {
        Config {
            unix_socket: true,
            interactive,
            ..Default::default()
        }
    }

    fn locator(resource: &str) -> SocketAddress {
        // The console never stats the path itself; validation happens before
        // a console is constructed.
        let raw = format!("/tmp/scour-test.sock {resource}");
        SocketAddress::resolve(&raw, &Config::default()).unwrap()
    }

    #[tokio::test]
    async fn one_shot_records_request_and_response() {
        let (client, mut peer) = UnixStream::pair().unwrap();
        let peer_task = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let n = peer.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"http:/images/json");
            peer.write_all(b"the response").await.unwrap();
            // dropping the peer closes the connection, ending the read
        });

        let console = Console::with_input(
            socket_config(false),
            locator("http:/images/json"),
            client,
            &b""[..],
        );
        let outcome = console.run().await;
        peer_task.await.unwrap();

        assert!(outcome.error.is_none(), "{:?}", outcome.error);
        assert_eq!(outcome.transcript.fragments().len(), 2);
        assert_eq!(outcome.transcript.fragments()[0], b"http:/images/json");
        assert_eq!(outcome.transcript.fragments()[1], b"the response");
        assert_eq!(
            outcome.transcript.flatten(),
            b"http:/images/json\nthe response\n".to_vec()
        );
    }

    #[tokio::test]
    async fn silent_peer_times_out_with_sent_fragment_only() {
        let (client, peer) = UnixStream::pair().unwrap();
        let peer_task = tokio::spawn(async move {
            // Hold the connection open past the turn deadline without
            // responding.
            tokio::time::sleep(TURN_TIMEOUT + Duration::from_millis(500)).await;
            drop(peer);
        });

        let console = Console::with_input(
            socket_config(false),
            locator("http:/get"),
            client,
            &b""[..],
        );
        let outcome = console.run().await;
        peer_task.await.unwrap();

        assert!(matches!(outcome.error, Some(ScourError::Timeout(_))));
        assert_eq!(outcome.transcript.fragments().len(), 1);
        assert_eq!(outcome.transcript.fragments()[0], b"http:/get");
    }

    #[tokio::test]
    async fn interactive_close_sentinel_is_not_recorded() {
        let (client, mut peer) = UnixStream::pair().unwrap();
        let peer_task = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let n = peer.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"/get/0");
            peer.write_all(b"record-zero").await.unwrap();
        });

        let console = Console::with_input(
            socket_config(true),
            locator("http:/get"),
            client,
            &b"/get/0\n:close\n"[..],
        );
        let outcome = console.run().await;
        peer_task.await.unwrap();

        assert!(outcome.error.is_none(), "{:?}", outcome.error);
        assert_eq!(outcome.transcript.fragments().len(), 2);
        assert!(outcome
            .transcript
            .fragments()
            .iter()
            .all(|f| f.as_slice() != SESSION_CLOSE.as_bytes()));
    }

    #[tokio::test]
    async fn interactive_empty_line_closes_cleanly() {
        let (client, _peer) = UnixStream::pair().unwrap();
        let console = Console::with_input(
            socket_config(true),
            locator("http:/get"),
            client,
            &b"\n/never-sent\n"[..],
        );
        let outcome = console.run().await;
        assert!(outcome.error.is_none());
        assert!(outcome.transcript.is_empty());
    }

    #[tokio::test]
    async fn interactive_end_of_input_closes_cleanly() {
        let (client, _peer) = UnixStream::pair().unwrap();
        let console =
            Console::with_input(socket_config(true), locator("http:/get"), client, &b""[..]);
        let outcome = console.run().await;
        assert!(outcome.error.is_none());
        assert!(outcome.transcript.is_empty());
    }

    #[tokio::test]
    async fn declined_retry_surfaces_send_failure() {
        let (client, peer) = UnixStream::pair().unwrap();
        drop(peer); // every write fails with a broken pipe

        let console = Console::with_input(
            socket_config(true),
            locator("http:/get"),
            client,
            &b"/get/0\nn\n"[..],
        );
        let outcome = console.run().await;

        assert!(matches!(outcome.error, Some(ScourError::SendFailure(_))));
        assert!(outcome.transcript.is_empty());
    }

    #[tokio::test]
    async fn confirmed_retries_exhaust_the_budget() {
        let (client, peer) = UnixStream::pair().unwrap();
        drop(peer);

        // One confirmation per failed attempt: the initial failure plus five
        // retries, then the budget is spent.
        let console = Console::with_input(
            socket_config(true),
            locator("http:/get"),
            client,
            &b"/get/0\ny\ny\ny\ny\ny\ny\n"[..],
        );
        let outcome = console.run().await;

        assert!(matches!(
            outcome.error,
            Some(ScourError::RetryLimitExceeded(5))
        ));
        assert!(outcome.transcript.is_empty());
    }

    #[tokio::test]
    async fn malformed_prompt_answers_disable_retry() {
        let (client, peer) = UnixStream::pair().unwrap();
        drop(peer);

        let console = Console::with_input(
            socket_config(true),
            locator("http:/get"),
            client,
            &b"/get/0\nmaybe\nsure\nok\nhm\nnah\n"[..],
        );
        let outcome = console.run().await;

        // Five malformed answers, retry disabled, original failure surfaced.
        assert!(matches!(outcome.error, Some(ScourError::SendFailure(_))));
        assert!(outcome.transcript.is_empty());
    }

    #[tokio::test]
    async fn non_interactive_send_failure_is_never_retried() {
        let (client, peer) = UnixStream::pair().unwrap();
        drop(peer);

        let console = Console::with_input(
            socket_config(false),
            locator("http:/get"),
            client,
            // Input that would confirm a retry if one were offered.
            &b"y\ny\n"[..],
        );
        let outcome = console.run().await;

        assert!(matches!(outcome.error, Some(ScourError::SendFailure(_))));
        assert!(outcome.transcript.is_empty());
    }

    #[tokio::test]
    async fn interactive_error_preserves_earlier_turns() {
        let (client, mut peer) = UnixStream::pair().unwrap();
        let peer_task = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let n = peer.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"/get/0");
            peer.write_all(b"first").await.unwrap();
            // close before the second request so its send fails
        });

        let console = Console::with_input(
            socket_config(true),
            locator("http:/get"),
            client,
            &b"/get/0\n/get/1\nn\n"[..],
        );
        let outcome = console.run().await;
        peer_task.await.unwrap();

        assert!(outcome.error.is_some());
        assert_eq!(outcome.transcript.fragments().len(), 2);
        assert_eq!(outcome.transcript.fragments()[0], b"/get/0");
        assert_eq!(outcome.transcript.fragments()[1], b"first");
    }
}
