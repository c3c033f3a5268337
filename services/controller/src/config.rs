//! Controller configuration (env-driven).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tsync_reconcile::{DocumentKey, DEFAULT_DOCUMENT_NAME, DEFAULT_MAX_ENTRY_BYTES, DEFAULT_NAMESPACE};

/// Smallest accepted `TSYNC_MAX_ENTRY_BYTES`.
pub const MIN_ENTRY_BYTES: usize = 64;

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory of `*.json` / `*.toml` declaration files.
    pub declarations_dir: PathBuf,

    /// JSON file listing the cluster nodes.
    pub nodes_file: PathBuf,

    /// Root directory of the document store.
    pub state_dir: PathBuf,

    /// Key of the published document.
    pub document: DocumentKey,

    /// Period of the resync pass when nothing triggers one.
    pub resync_interval: Duration,

    /// Largest encoded entry accepted for a single node.
    pub max_entry_bytes: usize,

    /// First requeue delay after a failed pass.
    pub backoff_base: Duration,

    /// Upper bound on the requeue delay.
    pub backoff_max: Duration,

    /// Run a single pass and exit.
    pub once: bool,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let declarations_dir = var("TSYNC_DECLARATIONS_DIR")
            .unwrap_or_else(|| "/etc/tsync/declarations".to_string())
            .into();

        let nodes_file = var("TSYNC_NODES_FILE")
            .unwrap_or_else(|| "/etc/tsync/nodes.json".to_string())
            .into();

        let state_dir = var("TSYNC_STATE_DIR")
            .unwrap_or_else(|| "/var/lib/tsync".to_string())
            .into();

        let document = DocumentKey::new(
            var("TSYNC_DOCUMENT_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            var("TSYNC_DOCUMENT_NAME").unwrap_or_else(|| DEFAULT_DOCUMENT_NAME.to_string()),
        );
        validate_path_segment("TSYNC_DOCUMENT_NAMESPACE", &document.namespace)?;
        validate_path_segment("TSYNC_DOCUMENT_NAME", &document.name)?;

        let resync_secs: u64 = parse_var(&var, "TSYNC_RESYNC_INTERVAL_SECS")?.unwrap_or(30);
        let resync_interval = Duration::from_secs(resync_secs.max(1));

        let max_entry_bytes: usize =
            parse_var(&var, "TSYNC_MAX_ENTRY_BYTES")?.unwrap_or(DEFAULT_MAX_ENTRY_BYTES);
        if max_entry_bytes < MIN_ENTRY_BYTES {
            bail!("TSYNC_MAX_ENTRY_BYTES must be at least {MIN_ENTRY_BYTES}, got {max_entry_bytes}.");
        }

        let backoff_base_ms: u64 = parse_var(&var, "TSYNC_BACKOFF_BASE_MS")?.unwrap_or(500);
        let backoff_max_ms: u64 = parse_var(&var, "TSYNC_BACKOFF_MAX_MS")?.unwrap_or(60_000);
        let backoff_base = Duration::from_millis(backoff_base_ms.max(10));
        let backoff_max = Duration::from_millis(backoff_max_ms).max(backoff_base);

        let once = var("TSYNC_ONCE")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let log_level = var("TSYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            declarations_dir,
            nodes_file,
            state_dir,
            document,
            resync_interval,
            max_entry_bytes,
            backoff_base,
            backoff_max,
            once,
            log_level,
        })
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(key)
        .map(|v| v.trim().parse::<T>())
        .transpose()
        .with_context(|| format!("{key} must be a non-negative integer."))
}

/// Document keys become file paths, so each part must be one plain segment.
fn validate_path_segment(key: &str, value: &str) -> Result<()> {
    tsync_id::validate_dns_subdomain("document key", value)
        .with_context(|| format!("{key} must be a DNS-1123 subdomain."))
}
