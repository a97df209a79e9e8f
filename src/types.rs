use serde::{Deserialize, Deserializer, Serialize};

/// DOGE amounts arrive as JSON strings (the indexer serializes them to
/// preserve precision), but older payloads used plain numbers; accept both.
fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Num(v) => Ok(v),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Connection status owned by the monitor task.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Online,
    Offline,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Online => write!(f, "online"),
            ConnectionState::Offline => write!(f, "offline"),
        }
    }
}

/// One block row as served by the indexer, newest-first in `/blocks`.
///
/// `timestamp` is kept as the raw string from the payload; the indexer has
/// been observed serving malformed values, which downstream code must skip.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entry {
    pub height: u64,
    pub hash: String,
    #[serde(default)]
    pub timestamp: String,
    pub tx_count: Option<u64>,
    pub utxo_created: Option<u64>,
    pub utxo_spent: Option<u64>,
    pub processing_time_ms: Option<u64>,
}

/// The full result of one successful poll. Replaced wholesale each time;
/// never persisted.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub entries: Vec<Entry>,
    pub tip_height: Option<u64>,
}

/// Balance figures for one address, in DOGE as served by the indexer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Balance {
    #[serde(default, deserialize_with = "de_amount")]
    pub available: f64,
    #[serde(default, deserialize_with = "de_amount")]
    pub incoming: f64,
    #[serde(default, deserialize_with = "de_amount")]
    pub current: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Utxo {
    pub tx: String,
    pub vout: u32,
    #[serde(default, deserialize_with = "de_amount")]
    pub value: f64,
    #[serde(rename = "type")]
    pub script_type: Option<String>,
    pub script: Option<String>,
}

/// Result of a one-shot address lookup (balance + UTXOs fetched together).
#[derive(Clone, Debug)]
pub struct AddressInfo {
    pub address: String,
    pub balance: Balance,
    pub utxos: Vec<Utxo>,
}

/// Events delivered to the UI loop from spawned one-shot tasks.
#[derive(Clone, Debug)]
pub enum AppEvent {
    LookupFinished {
        address: String,
        result: Result<AddressInfo, String>,
    },
}

impl AppEvent {
    pub fn lookup_finished(address: String, result: anyhow::Result<AddressInfo>) -> Self {
        AppEvent::LookupFinished {
            address,
            result: result.map_err(|e| format!("{e:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_accepts_string_amounts() {
        let b: Balance =
            serde_json::from_str(r#"{"available":"12.5","incoming":"0","current":"12.5"}"#)
                .unwrap();
        assert_eq!(b.available, 12.5);
        assert_eq!(b.incoming, 0.0);
        assert_eq!(b.current, 12.5);
    }

    #[test]
    fn balance_accepts_numeric_amounts_and_defaults() {
        let b: Balance = serde_json::from_str(r#"{"available":3.25}"#).unwrap();
        assert_eq!(b.available, 3.25);
        assert_eq!(b.current, 0.0);
    }

    #[test]
    fn utxo_value_accepts_string_amount() {
        let u: Utxo = serde_json::from_str(
            r#"{"tx":"abc","vout":1,"value":"0.00000001","type":"p2pkh","script":null}"#,
        )
        .unwrap();
        assert_eq!(u.value, 0.00000001);
    }

    #[test]
    fn balance_rejects_unparseable_amount() {
        let res = serde_json::from_str::<Balance>(r#"{"available":"lots"}"#);
        assert!(res.is_err());
    }
}
