//! Depot CLI — command-line client for the Depot deployment store.
//!
//! A standalone HTTP client that communicates with the Depot server. No
//! internal crate dependencies; it talks exclusively via the REST API.
//! Built for orchestration scripts: `get` polls until the value appears,
//! so one machine can block on a key another machine publishes minutes
//! later.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::time::Instant;

/// Maximum number of bytes uploaded from a file value.
const MAX_FILE_SIZE: u64 = 10_000_000;

/// Fixed delay between `get` polls. No backoff, no jitter.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

// ── CLI structure ────────────────────────────────────────────────────

/// Depot — deployment key/value store client.
#[derive(Parser)]
#[command(
    name = "depot",
    version,
    about = "Depot CLI — create deployments and read/write their key/value pairs",
    long_about = None,
    after_help = "Environment variables:\n  \
        DEPOT_URL           Server address (default: http://127.0.0.1:8300)\n  \
        DEPOT_DEPLOYMENT    Deployment id\n  \
        DEPOT_TOKEN         Deployment capability token\n  \
        DEPOT_API_KEY       API key for the identity directory\n  \
        DEPOT_TRIM          Upload only the last N bytes of file values\n\n\
        Examples:\n  \
        depot create\n  \
        depot put master_ip 10.0.0.1\n  \
        depot get master_ip --timeout 10\n  \
        depot put bootstrap_log @/var/log/bootstrap.log"
)]
struct Cli {
    /// Depot server address.
    #[arg(long, env = "DEPOT_URL", default_value = "http://127.0.0.1:8300")]
    url: String,

    /// Deployment id.
    #[arg(long, env = "DEPOT_DEPLOYMENT")]
    deployment: Option<String>,

    /// Deployment capability token.
    #[arg(long, env = "DEPOT_TOKEN")]
    token: Option<String>,

    /// API key for the identity directory.
    #[arg(long, env = "DEPOT_API_KEY")]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new deployment and print its id and token.
    Create {
        /// Namespace to record on the new deployment.
        #[arg(long)]
        namespace: Option<String>,
    },
    /// Read a deployment value, polling until it appears or the timeout expires.
    Get {
        /// Key to read.
        key: String,
        /// Give up after this many minutes.
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
    /// Set a deployment value. A value of `@path` uploads the file's contents.
    Put {
        /// Key to write.
        key: String,
        /// Value, or `@path` to upload a file.
        value: String,
    },
    /// Delete the deployment.
    Delete,
}

// ── HTTP client ──────────────────────────────────────────────────────

struct Client {
    http: reqwest::Client,
    url: String,
    deployment: Option<String>,
    token: Option<String>,
    api_key: Option<String>,
}

impl Client {
    fn new(cli: &Cli) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: cli.url.trim_end_matches('/').to_owned(),
            deployment: cli.deployment.clone(),
            token: cli.token.clone(),
            api_key: cli.api_key.clone(),
        }
    }

    fn deployment(&self) -> Result<&str> {
        self.deployment
            .as_deref()
            .ok_or_else(|| {
                anyhow::anyhow!("no deployment id: set DEPOT_DEPLOYMENT or use --deployment")
            })
    }

    fn bearer(&self) -> Result<String> {
        self.token
            .as_ref()
            .map(|t| format!("Bearer {t}"))
            .ok_or_else(|| anyhow::anyhow!("no token: set DEPOT_TOKEN or use --token"))
    }

    async fn create(&self, namespace: Option<&str>) -> Result<Value> {
        let mut request = self.http.post(format!("{}/store", self.url));
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }
        if let Some(ns) = namespace {
            request = request.header("X-API-NS", ns);
        }
        let response = request.send().await.context("failed to contact server")?;
        handle_response(response).await
    }

    /// One read attempt. `Ok(None)` means "not there yet, keep polling".
    async fn try_get(&self, key: &str) -> Result<Option<String>> {
        let deployment = self.deployment()?;
        let bearer = self.bearer()?;
        let response = self
            .http
            .get(format!("{}/store/{deployment}/{key}", self.url))
            .header("Authorization", bearer)
            .send()
            .await;

        let Ok(response) = response else {
            // Server unreachable: retryable, same as a missing key.
            return Ok(None);
        };
        if !response.status().is_success() {
            return Ok(None);
        }

        let body: Value = response
            .json()
            .await
            .context("failed to parse response JSON")?;
        Ok(body["value"].as_str().map(ToOwned::to_owned))
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let deployment = self.deployment()?;
        let bearer = self.bearer()?;
        let response = self
            .http
            .put(format!("{}/store/{deployment}", self.url))
            .header("Authorization", bearer)
            .json(&serde_json::json!({"key": key, "value": value}))
            .send()
            .await
            .context("failed to contact server")?;
        handle_response(response).await?;
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        let deployment = self.deployment()?;
        let bearer = self.bearer()?;
        let response = self
            .http
            .delete(format!("{}/store/{deployment}", self.url))
            .header("Authorization", bearer)
            .send()
            .await
            .context("failed to contact server")?;
        handle_response(response).await?;
        Ok(())
    }
}

async fn handle_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .context("failed to read response body")?;
    if !status.is_success() {
        bail!("server returned {status}: {body}");
    }
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).context("failed to parse response JSON")
}

// ── Polling loop ─────────────────────────────────────────────────────

/// Poll `fetch` at a fixed interval until it yields a value or `timeout`
/// elapses. The first attempt happens immediately.
async fn wait_for_value<F, Fut>(mut fetch: F, interval: Duration, timeout: Duration) -> Option<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<String>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(Some(value)) = fetch().await {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(interval).await;
    }
}

// ── File values ──────────────────────────────────────────────────────

/// Resolve a `put` value argument: `@path` uploads the file's contents,
/// trimmed to the last `limit` bytes when the file is larger.
fn resolve_value(value: &str, limit: u64) -> Result<String> {
    let Some(path) = value.strip_prefix('@') else {
        return Ok(value.to_owned());
    };
    let data = read_file_tail(Path::new(path), limit)
        .with_context(|| format!("could not read file {path}"))?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

/// The byte limit for file uploads: `DEPOT_TRIM` if set, capped at
/// [`MAX_FILE_SIZE`].
fn trim_limit() -> u64 {
    std::env::var("DEPOT_TRIM")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(MAX_FILE_SIZE, |trim| trim.min(MAX_FILE_SIZE))
}

/// Read the last `limit` bytes of a file (the whole file if it is smaller).
fn read_file_tail(path: &Path, limit: u64) -> Result<Vec<u8>> {
    let mut file = std::fs::File::open(path)?;
    let size = file.metadata()?.len();
    if size > limit {
        eprintln!("reading only the last {limit} bytes of {}", path.display());
        let offset = i64::try_from(limit).unwrap_or(i64::MAX);
        file.seek(SeekFrom::End(-offset))?;
    }
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let client = Client::new(&cli);

    match run(&client, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &Client, command: Commands) -> Result<()> {
    match command {
        Commands::Create { namespace } => {
            let body = client.create(namespace.as_deref()).await?;
            println!("url={}", body["url"].as_str().unwrap_or_default());
            println!("id={}", body["id"].as_str().unwrap_or_default());
            println!("token={}", body["token"].as_str().unwrap_or_default());
            Ok(())
        }
        Commands::Get { key, timeout } => {
            // Fail fast on missing credentials instead of polling on them.
            client.deployment()?;
            client.bearer()?;

            let key = key.trim();
            let value = wait_for_value(
                || client.try_get(key),
                POLL_INTERVAL,
                Duration::from_secs(timeout.saturating_mul(60)),
            )
            .await;

            match value {
                Some(value) => {
                    println!("{value}");
                    Ok(())
                }
                None => bail!("failed to get deployment key {key}"),
            }
        }
        Commands::Put { key, value } => {
            let value = resolve_value(value.trim(), trim_limit())?;
            client.put(key.trim(), &value).await
        }
        Commands::Delete => client.delete().await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn wait_for_value_returns_immediately_on_success() {
        let value = wait_for_value(
            || async { Ok(Some("ready".to_owned())) },
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(value.as_deref(), Some("ready"));
    }

    #[tokio::test]
    async fn wait_for_value_succeeds_on_a_later_poll() {
        // The value appears on the third attempt; with a short interval the
        // loop must pick it up rather than give up after the first miss.
        let attempts = AtomicU32::new(0);
        let value = wait_for_value(
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n >= 2 {
                        Ok(Some("late".to_owned()))
                    } else {
                        Ok(None)
                    }
                }
            },
            Duration::from_millis(10),
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(value.as_deref(), Some("late"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn wait_for_value_times_out() {
        let attempts = AtomicU32::new(0);
        let value = wait_for_value(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok(None) }
            },
            Duration::from_millis(10),
            Duration::from_millis(35),
        )
        .await;

        assert_eq!(value, None);
        // Immediate attempt plus one per interval until the deadline.
        assert!(attempts.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn resolve_value_passes_plain_values_through() {
        let value = resolve_value("10.0.0.1", MAX_FILE_SIZE).unwrap();
        assert_eq!(value, "10.0.0.1");
    }

    #[test]
    fn resolve_value_reads_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "file-payload").unwrap();

        let arg = format!("@{}", file.path().display());
        let value = resolve_value(&arg, MAX_FILE_SIZE).unwrap();
        assert_eq!(value, "file-payload");
    }

    #[test]
    fn resolve_value_trims_large_files_to_tail() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "0123456789").unwrap();

        let arg = format!("@{}", file.path().display());
        let value = resolve_value(&arg, 4).unwrap();
        assert_eq!(value, "6789");
    }

    #[test]
    fn resolve_value_missing_file_fails() {
        let result = resolve_value("@/no/such/file", MAX_FILE_SIZE);
        assert!(result.is_err());
    }
}
