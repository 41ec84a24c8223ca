//! Command-line front end: one interactive session per invocation.
//!
//! ```text
//! wsbridge wss://echo.example.com/socket -H "Authorization: Bearer t" --transcript log.txt
//! ```
//!
//! Logging goes to stderr and is controlled by `WSBRIDGE_LOG`
//! (`EnvFilter` syntax, default `warn`).

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use wsbridge::protocol::DEFAULT_USER_AGENT;
use wsbridge::protocol::headers::parse_header_line;
use wsbridge::{
    BridgeConfig, BridgeRequest, Error, KeystrokeInput, ProxyConfig, Result, WebsocketBridge,
};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "WSBRIDGE_LOG";

#[derive(Debug, Parser)]
#[command(name = "wsbridge", version, about = "Interactive WebSocket client")]
struct Cli {
    /// Target URL (ws:// or wss://).
    url: String,

    /// Handshake header as `Name: value`. Repeatable.
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    headers: Vec<String>,

    /// Proxy URL such as `socks5://127.0.0.1:1080`. Only the first is used.
    #[arg(long = "proxy", value_name = "URL")]
    proxies: Vec<String>,

    /// Skip server certificate verification.
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Client certificate (PEM, or certificate chain when `--key` is given).
    #[arg(long, value_name = "FILE")]
    cert: Option<PathBuf>,

    /// Private key for `--cert`.
    #[arg(long, value_name = "FILE", requires = "cert")]
    key: Option<PathBuf>,

    /// Password of the private key.
    #[arg(long, value_name = "PASSWORD", requires = "key")]
    key_password: Option<String>,

    /// Connect timeout in seconds.
    #[arg(long, value_name = "SECS", value_parser = parse_timeout)]
    timeout: Option<Duration>,

    /// Outbound queue bound.
    #[arg(long, value_name = "N")]
    queue_size: Option<usize>,

    /// Write the exchange transcript to this file.
    #[arg(long, value_name = "FILE")]
    transcript: Option<PathBuf>,

    /// Read keystrokes from the terminal instead of buffered stdin.
    #[arg(long)]
    keystrokes: bool,
}

fn main() -> ExitCode {
    init_logging();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("wsbridge: {e}");
            ExitCode::from(2)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let request = build_request(&cli)?;

    let mut config = BridgeConfig::default();
    if let Some(size) = cli.queue_size {
        config = config.with_queue_size(size);
    }
    if cli.transcript.is_some() {
        config = config.with_transcript();
    }

    let bridge = WebsocketBridge::new(config);
    let response = if cli.keystrokes {
        let mut input = KeystrokeInput::new(bridge.config().poll_interval);
        bridge.send_with_input(&request, &mut input)?
    } else {
        bridge.send(&request)?
    };
    debug!(status = response.status, "Session finished");

    if let Some(path) = &cli.transcript {
        std::fs::write(path, response.raw_bytes())?;
    }

    if response.is_success() {
        println!("{}", response.body);
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn build_request(cli: &Cli) -> Result<BridgeRequest> {
    let mut request = BridgeRequest::new(cli.url.clone());

    for line in &cli.headers {
        let (name, value) = parse_header_line(line)
            .ok_or_else(|| Error::invalid_argument(format!("malformed header: {line}")))?;
        request = request.header(name, value);
    }
    let has_user_agent = request
        .headers
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("user-agent"));
    if !has_user_agent {
        request = request.header("User-Agent", DEFAULT_USER_AGENT);
    }

    for raw in &cli.proxies {
        request = request.proxy(ProxyConfig::parse(raw)?);
    }

    if let Some(timeout) = cli.timeout {
        request = request.timeout(timeout);
    }

    if cli.insecure {
        request = request.insecure();
    }
    request = match (&cli.cert, &cli.key) {
        (Some(cert), Some(key)) => {
            request.client_cert_bundle(cert.clone(), key.clone(), cli.key_password.clone())
        }
        (Some(cert), None) => request.client_cert(cert.clone()),
        _ => request,
    };

    Ok(request)
}

/// Parses `--timeout`: a positive, representable number of seconds.
fn parse_timeout(raw: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("not a number: {e}"))?;
    if secs <= 0.0 {
        return Err(format!("must be positive, got {secs}"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("out of range: {e}"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(["wsbridge", "ws://localhost:8000/"].iter().chain(args))
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("1.5"), Ok(Duration::from_millis(1500)));
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("-2").is_err());
        assert!(parse_timeout("NaN").is_err());
        assert!(parse_timeout("inf").is_err());
        assert!(parse_timeout("soon").is_err());
    }

    #[test]
    fn test_huge_timeout_is_a_usage_error() {
        let err = cli(&["--timeout", "1e30"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_build_request_adds_default_user_agent() {
        let request = build_request(&cli(&["-H", "X-Token: abc"]).unwrap()).unwrap();
        assert_eq!(
            request.headers,
            vec![
                ("X-Token".to_string(), "abc".to_string()),
                ("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string()),
            ]
        );
    }

    #[test]
    fn test_build_request_keeps_user_agent_and_timeout() {
        let parsed = cli(&["-H", "user-agent: custom/1", "--timeout", "2"]).unwrap();
        let request = build_request(&parsed).unwrap();
        assert_eq!(
            request.headers,
            vec![("user-agent".to_string(), "custom/1".to_string())]
        );
        assert_eq!(request.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_build_request_rejects_malformed_header() {
        let parsed = cli(&["-H", "no colon"]).unwrap();
        assert!(matches!(build_request(&parsed), Err(Error::InvalidArgument { .. })));
    }
}
