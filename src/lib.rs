//! Dogewatch - Dogecoin Indexer Monitor
//!
//! Terminal UI that keeps a live view of a Dogecoin indexer's head state:
//! it polls the indexer for recent blocks and tip height, highlights newly
//! observed blocks, predicts when the next block should arrive, and
//! reconnects automatically with exponential backoff when the backend goes
//! away. A second tab looks up the balance and UTXO set of an address.
//!
//! The connection/polling state machine lives in [`monitor`]; everything it
//! exposes to the UI flows through a read-only [`monitor::MonitorView`]
//! published over a watch channel.

pub mod api;
pub mod app;
pub mod config;
pub mod differ;
pub mod monitor;
pub mod predictor;
pub mod retry;
pub mod types;
pub mod ui;
pub mod util_text;
