//! scour — command-line resource fetcher over HTTP and unix domain sockets.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use scour::records::{DEFAULT_RECORDS_PATH, SEED_COUNT};
use scour::{config, Config, HttpAddress, Locator, Method, Mode, RecordSet, ScourResult, SocketAddress};
use scour_cli::console::Console;
use scour_cli::invoke::{invoke, NormalizedHeaders};
use scour_cli::server::RecordServer;

const BANNER: &str = r#"
 _______  _______  _______  __   __  ______
|       ||       ||       ||  | |  ||    _ |
|  _____||       ||   _   ||  | |  ||   | ||
| |_____ |       ||  | |  ||  |_|  ||   |_||_
|_____  ||      _||  |_|  ||       ||    __  |
 _____| ||     |_ |       ||       ||   |  | |
|_______||_______||_______||_______||___|  |_|
"#;

const USAGE_HINT: &str =
    "usage: scour [flags] <url>  |  scour -u [flags] <socket-path> <resource>";

#[derive(Parser)]
#[command(
    name = "scour",
    about = "Fetch resources over HTTP or a unix domain socket",
    version
)]
struct Cli {
    /// Target: a URL, or `<socket-path> <resource>` with --unix-socket.
    target: Vec<String>,

    /// Verbose mode: debug logging plus connection/response diagnostics.
    #[arg(short, long)]
    verbose: bool,

    /// Request method (GET, PUT, POST, DELETE, PATCH).
    #[arg(short = 'X', long = "request", default_value = "GET")]
    method: String,

    /// Request body data.
    #[arg(short, long, default_value = "")]
    data: String,

    /// Custom request header, `name: value`. Repeatable.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Connect through a unix domain socket instead of using the network.
    #[arg(short, long)]
    unix_socket: bool,

    /// Interactive console mode for socket connections.
    #[arg(short, long)]
    interactive: bool,

    /// Create a record-serving socket at the given path and run it.
    #[arg(long, value_name = "PATH")]
    create_socket: Option<PathBuf>,

    /// Generate shell completions and exit.
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "scour", &mut std::io::stdout());
        return Ok(());
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid flags: {e}");
            eprintln!("{USAGE_HINT}");
            process::exit(1);
        }
    };

    if config.verbose {
        eprintln!("{BANNER}");
    }

    if let Some(path) = cli.create_socket {
        let records = RecordSet::load_or_seed(Path::new(DEFAULT_RECORDS_PATH), SEED_COUNT)?;
        let server = RecordServer::bind(path, records)?;
        server.run().await?;
        return Ok(());
    }

    if config.mode() == Mode::Http && cli.target.len() > 1 {
        eprintln!("too many arguments: one url expected");
        eprintln!("{USAGE_HINT}");
        process::exit(1);
    }

    let raw_target = cli.target.join(" ");
    if raw_target.is_empty() {
        match config.mode() {
            Mode::Socket => eprintln!("pass a target: scour -u [flags] <socket-path> <resource>"),
            Mode::Http => eprintln!("pass a target: scour [flags] <url>"),
        }
        process::exit(1);
    }

    let locator = match resolve_target(&raw_target, &config) {
        Ok(locator) => locator,
        Err(e) => {
            eprintln!("could not resolve target: {e}");
            eprintln!("{USAGE_HINT}");
            process::exit(1);
        }
    };

    match locator {
        Locator::Http(addr) => run_http(&config, addr).await,
        Locator::Socket(addr) => run_socket(&config, addr).await,
    }
}

fn build_config(cli: &Cli) -> ScourResult<Config> {
    let method: Method = cli.method.parse()?;
    let mut headers = Vec::new();
    for raw in &cli.headers {
        headers.push(config::parse_header(raw)?);
    }
    Ok(Config {
        verbose: cli.verbose,
        method,
        data: cli.data.clone(),
        headers,
        unix_socket: cli.unix_socket,
        interactive: cli.interactive,
    })
}

fn resolve_target(raw: &str, config: &Config) -> ScourResult<Locator> {
    match config.mode() {
        Mode::Http => Ok(Locator::Http(HttpAddress::resolve(raw, config)?)),
        Mode::Socket => Ok(Locator::Socket(SocketAddress::resolve(raw, config)?)),
    }
}

async fn run_http(config: &Config, addr: HttpAddress) -> anyhow::Result<()> {
    if config.verbose {
        print_connecting(config, &addr);
    }
    let (headers, body) = invoke(config, config.method, &addr, config.data.as_bytes()).await?;
    if config.verbose {
        print_response_meta(&headers);
    }
    std::io::stdout().write_all(&body)?;
    println!();
    Ok(())
}

async fn run_socket(config: &Config, addr: SocketAddress) -> anyhow::Result<()> {
    if let Err(e) = addr.is_valid() {
        eprintln!("could not resolve target: {e}");
        eprintln!("{USAGE_HINT}");
        process::exit(1);
    }

    let console = Console::connect(config.clone(), addr).await?;
    let outcome = tokio::select! {
        outcome = console.run() => outcome,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted");
            process::exit(1);
        }
    };

    std::io::stdout().write_all(&outcome.transcript.flatten())?;
    match outcome.error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn print_connecting(config: &Config, addr: &HttpAddress) {
    let display_path = if addr.path() == "/" {
        "/".to_string()
    } else {
        format!("/{}", addr.path())
    };
    eprintln!("connecting to {}", addr.host());
    eprintln!("*   Trying {}...", addr.host());
    eprintln!("* Connected to {0} ({0}) port {1}", addr.host(), addr.port());
    eprintln!(
        "> {} {} {}/1.1",
        config.method,
        display_path,
        addr.scheme().as_str().to_uppercase()
    );
    eprintln!("> Host: {}", addr.host());
    eprintln!("> Accept: */*");
}

fn print_response_meta(headers: &NormalizedHeaders) {
    eprintln!("< {} {}", headers.protocol, headers.status);
    eprintln!("< Date: {}", headers.date);
    eprintln!("< Content-Type: {}", headers.content_type);
    eprintln!("< Content-Length: {}", headers.content_length);
    eprintln!("< Connection: {}", headers.connection);
    eprintln!("< Server: {}", headers.server);
    eprintln!(
        "< Access-Control-Allow-Origin: {}",
        headers.access_control_allow_origin
    );
    eprintln!(
        "< Access-Control-Allow-Credentials: {}",
        headers.access_control_allow_credentials
    );
}
