use anyhow::{anyhow, Result};
use clap::Parser;
use std::env;

/// Dogewatch - Dogecoin Indexer Monitor
///
/// Terminal UI that tracks the head of a Dogecoin indexer: live block feed
/// with new-block highlighting, next-block prediction, automatic reconnect,
/// and address balance/UTXO lookup.
/// Configuration priority: CLI args > Environment variables > Defaults
#[derive(Parser, Debug, Default)]
#[command(name = "dogewatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dogecoin Indexer Monitor", long_about = None)]
pub struct CliArgs {
    /// Indexer API base URL
    #[arg(long, env = "INDEXER_URL")]
    pub indexer_url: Option<String>,

    /// Block data refresh interval in milliseconds (1000-60000)
    #[arg(long, env = "POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<u64>,

    /// Reconnection attempt interval in milliseconds (1000-60000)
    #[arg(long, env = "RECONNECT_INTERVAL_MS")]
    pub reconnect_interval_ms: Option<u64>,

    /// HTTP request timeout in milliseconds (1000-60000)
    #[arg(long, env = "REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    /// Number of retry attempts for failed API requests (0-10)
    #[arg(long, env = "RETRY_MAX")]
    pub retry_max: Option<u32>,

    /// Base retry delay in milliseconds (100-10000)
    #[arg(long, env = "RETRY_BASE_DELAY_MS")]
    pub retry_base_delay_ms: Option<u64>,

    /// Maximum retry delay in milliseconds (1000-60000)
    #[arg(long, env = "RETRY_MAX_DELAY_MS")]
    pub retry_max_delay_ms: Option<u64>,

    /// Exponential backoff multiplier (1-10)
    #[arg(long, env = "RETRY_MULTIPLIER")]
    pub retry_multiplier: Option<u32>,

    /// How long new-block highlights stay visible, in milliseconds (500-30000)
    #[arg(long, env = "NEW_ENTRY_MARKER_MS")]
    pub new_entry_marker_ms: Option<u64>,

    /// Maximum number of blocks to display (1-100)
    #[arg(long, env = "MAX_BLOCKS_DISPLAY")]
    pub max_blocks_display: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub indexer_url: String,
    pub poll_interval_ms: u64,
    pub reconnect_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub retry_max: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub retry_multiplier: u32,
    pub new_entry_marker_ms: u64,
    pub max_blocks_display: usize,
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

/// Validate URL format (basic check)
fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{name} must start with http:// or https://"))
    }
}

/// Load configuration from CLI args and environment variables
/// Priority: CLI args > Environment variables > Defaults
pub fn load() -> Result<Config> {
    from_args(CliArgs::parse())
}

pub fn from_args(args: CliArgs) -> Result<Config> {
    let indexer_url = args
        .indexer_url
        .or_else(|| env::var("INDEXER_URL").ok())
        .unwrap_or_else(|| "http://127.0.0.1:8080/api".to_string());
    validate_url(&indexer_url, "INDEXER_URL")?;

    let poll_interval_ms = args
        .poll_interval_ms
        .or_else(|| env::var("POLL_INTERVAL_MS").ok().and_then(|s| s.parse().ok()))
        .unwrap_or(10000);
    let poll_interval_ms = validate_in_range(poll_interval_ms, 1000, 60000, "POLL_INTERVAL_MS")?;

    let reconnect_interval_ms = args
        .reconnect_interval_ms
        .or_else(|| {
            env::var("RECONNECT_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
        })
        .unwrap_or(10000);
    let reconnect_interval_ms = validate_in_range(
        reconnect_interval_ms,
        1000,
        60000,
        "RECONNECT_INTERVAL_MS",
    )?;

    let request_timeout_ms = args
        .request_timeout_ms
        .or_else(|| {
            env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
        })
        .unwrap_or(8000);
    let request_timeout_ms =
        validate_in_range(request_timeout_ms, 1000, 60000, "REQUEST_TIMEOUT_MS")?;

    let retry_max = args
        .retry_max
        .or_else(|| env::var("RETRY_MAX").ok().and_then(|s| s.parse().ok()))
        .unwrap_or(3);
    let retry_max = validate_in_range(retry_max, 0, 10, "RETRY_MAX")?;

    let retry_base_delay_ms = args
        .retry_base_delay_ms
        .or_else(|| {
            env::var("RETRY_BASE_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
        })
        .unwrap_or(1000);
    let retry_base_delay_ms =
        validate_in_range(retry_base_delay_ms, 100, 10000, "RETRY_BASE_DELAY_MS")?;

    let retry_max_delay_ms = args
        .retry_max_delay_ms
        .or_else(|| {
            env::var("RETRY_MAX_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
        })
        .unwrap_or(10000);
    let retry_max_delay_ms =
        validate_in_range(retry_max_delay_ms, 1000, 60000, "RETRY_MAX_DELAY_MS")?;

    let retry_multiplier = args
        .retry_multiplier
        .or_else(|| env::var("RETRY_MULTIPLIER").ok().and_then(|s| s.parse().ok()))
        .unwrap_or(2);
    let retry_multiplier = validate_in_range(retry_multiplier, 1, 10, "RETRY_MULTIPLIER")?;

    let new_entry_marker_ms = args
        .new_entry_marker_ms
        .or_else(|| {
            env::var("NEW_ENTRY_MARKER_MS")
                .ok()
                .and_then(|s| s.parse().ok())
        })
        .unwrap_or(4000);
    let new_entry_marker_ms =
        validate_in_range(new_entry_marker_ms, 500, 30000, "NEW_ENTRY_MARKER_MS")?;

    let max_blocks_display = args
        .max_blocks_display
        .or_else(|| {
            env::var("MAX_BLOCKS_DISPLAY")
                .ok()
                .and_then(|s| s.parse().ok())
        })
        .unwrap_or(10);
    let max_blocks_display = validate_in_range(max_blocks_display, 1, 100, "MAX_BLOCKS_DISPLAY")?;

    Ok(Config {
        indexer_url,
        poll_interval_ms,
        reconnect_interval_ms,
        request_timeout_ms,
        retry_max,
        retry_base_delay_ms,
        retry_max_delay_ms,
        retry_multiplier,
        new_entry_marker_ms,
        max_blocks_display,
    })
}

impl Config {
    #[allow(dead_code)]
    pub fn print_summary(&self) {
        eprintln!("Dogewatch Configuration:");
        eprintln!("  Indexer URL: {}", self.indexer_url);
        eprintln!("  Poll Interval: {}ms", self.poll_interval_ms);
        eprintln!("  Reconnect Interval: {}ms", self.reconnect_interval_ms);
        eprintln!("  Request Timeout: {}ms", self.request_timeout_ms);
        eprintln!(
            "  Retry: {} attempts, {}ms base, {}ms max, x{}",
            self.retry_max, self.retry_base_delay_ms, self.retry_max_delay_ms, self.retry_multiplier
        );
        eprintln!("  Max Blocks Display: {}", self.max_blocks_display);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = from_args(CliArgs::default()).unwrap();
        assert_eq!(cfg.poll_interval_ms, 10000);
        assert_eq!(cfg.reconnect_interval_ms, 10000);
        assert_eq!(cfg.retry_max, 3);
        assert_eq!(cfg.retry_base_delay_ms, 1000);
        assert_eq!(cfg.retry_max_delay_ms, 10000);
        assert_eq!(cfg.retry_multiplier, 2);
        assert_eq!(cfg.new_entry_marker_ms, 4000);
        assert_eq!(cfg.max_blocks_display, 10);
    }

    #[test]
    fn rejects_out_of_range_poll_interval() {
        let args = CliArgs {
            poll_interval_ms: Some(10),
            ..CliArgs::default()
        };
        assert!(from_args(args).is_err());
    }

    #[test]
    fn rejects_non_http_url() {
        let args = CliArgs {
            indexer_url: Some("ftp://indexer".into()),
            ..CliArgs::default()
        };
        assert!(from_args(args).is_err());
    }
}
