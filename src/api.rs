use crate::types::{AddressInfo, Balance, Entry, Utxo};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

static HTTP: OnceLock<reqwest::Client> = OnceLock::new();

fn http_client() -> &'static reqwest::Client {
    HTTP.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .expect("reqwest client")
    })
}

/// The indexer's REST surface as seen by the monitor.
///
/// Each method is a single fallible call; retry layering is the caller's
/// decision (the monitor wraps these in its backoff policy).
#[async_trait]
pub trait IndexerApi: Send + Sync + 'static {
    /// Lightweight liveness probe, cheaper than a full data fetch.
    async fn fetch_health(&self) -> Result<()>;
    /// Latest page of blocks, newest-first.
    async fn fetch_entries(&self) -> Result<Vec<Entry>>;
    /// Height of the most recent block known to the indexer.
    async fn fetch_tip_height(&self) -> Result<u64>;
    async fn fetch_balance(&self, address: &str) -> Result<Balance>;
    async fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>>;
}

#[derive(Deserialize)]
struct BlocksResponse {
    #[serde(default)]
    blocks: Vec<Entry>,
}

#[derive(Deserialize)]
struct HeightResponse {
    height: u64,
}

#[derive(Deserialize)]
struct UtxoResponse {
    #[serde(default)]
    utxo: Vec<Utxo>,
}

/// HTTP client for the indexer REST API.
pub struct HttpIndexerApi {
    base_url: String,
    timeout: Duration,
}

impl HttpIndexerApi {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {url}");

        let res = http_client()
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("request to {path} failed"))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("http {status} from {path}: {body}"));
        }

        res.json::<T>()
            .await
            .with_context(|| format!("invalid payload from {path}"))
    }
}

#[async_trait]
impl IndexerApi for HttpIndexerApi {
    async fn fetch_health(&self) -> Result<()> {
        let _: serde_json::Value = self.get_json("/health").await?;
        Ok(())
    }

    async fn fetch_entries(&self) -> Result<Vec<Entry>> {
        let res: BlocksResponse = self.get_json("/blocks").await?;
        Ok(res.blocks)
    }

    async fn fetch_tip_height(&self) -> Result<u64> {
        let res: HeightResponse = self.get_json("/height").await?;
        Ok(res.height)
    }

    async fn fetch_balance(&self, address: &str) -> Result<Balance> {
        self.get_json(&format!("/balance?address={}", urlencoding::encode(address)))
            .await
    }

    async fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>> {
        let res: UtxoResponse = self
            .get_json(&format!("/utxo?address={}", urlencoding::encode(address)))
            .await?;
        Ok(res.utxo)
    }
}

/// Fetch balance and UTXOs for one address in parallel.
pub async fn lookup_address<A: IndexerApi + ?Sized>(api: &A, address: &str) -> Result<AddressInfo> {
    let (balance, utxos) =
        futures::future::try_join(api.fetch_balance(address), api.fetch_utxos(address)).await?;
    Ok(AddressInfo {
        address: address.to_string(),
        balance,
        utxos,
    })
}
