use crate::api::IndexerApi;
use crate::config::Config;
use crate::differ;
use crate::predictor;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::{ConnectionState, Entry, Snapshot};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant, MissedTickBehavior};

/// Past this point the prediction is considered stale and the countdown is
/// dropped until fresh data restarts it.
pub const OVERDUE_CUTOFF_SECS: i64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorCommand {
    ManualRetry,
    Shutdown,
}

/// Timing knobs for the monitor, fixed at startup.
#[derive(Clone, Copy, Debug)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub reconnect_interval: Duration,
    pub retry: RetryPolicy,
    pub marker_lifetime: Duration,
}

impl From<&Config> for MonitorConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            poll_interval: Duration::from_millis(cfg.poll_interval_ms),
            reconnect_interval: Duration::from_millis(cfg.reconnect_interval_ms),
            retry: RetryPolicy {
                max_retries: cfg.retry_max,
                base_delay: Duration::from_millis(cfg.retry_base_delay_ms),
                max_delay: Duration::from_millis(cfg.retry_max_delay_ms),
                multiplier: cfg.retry_multiplier,
            },
            marker_lifetime: Duration::from_millis(cfg.new_entry_marker_ms),
        }
    }
}

/// Read-only projection of the monitor state, published on every mutation.
#[derive(Clone, Debug, Default)]
pub struct MonitorView {
    pub entries: Vec<Entry>,
    pub tip_height: Option<u64>,
    pub state: ConnectionState,
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub reconnect_attempts: u32,
    pub reconnect_countdown_secs: u64,
    pub next_arrival_countdown_secs: Option<i64>,
    pub new_positions: HashSet<usize>,
}

#[derive(Clone, Copy, Debug, Default)]
struct ReconnectContext {
    attempts: u32,
    countdown_secs: u64,
}

/// Connection/polling state machine.
///
/// One task owns all of this state; timers are `Option<Instant>` deadlines
/// consumed by the select loop, so arming a new cycle always happens after
/// the previous cycle's effects are applied, and clearing the Option is the
/// cancel. The poll and probe deadlines are mutually exclusive by state.
pub struct Monitor {
    api: Arc<dyn IndexerApi>,
    cfg: MonitorConfig,

    state: ConnectionState,
    snapshot: Snapshot,
    is_loading: bool,
    last_error: Option<String>,
    reconnect: ReconnectContext,
    predicted_at: Option<DateTime<Utc>>,
    next_arrival_countdown: Option<i64>,
    new_positions: HashSet<usize>,

    poll_at: Option<Instant>,
    probe_at: Option<Instant>,
    marker_clear_at: Option<Instant>,

    view_tx: watch::Sender<MonitorView>,
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl Monitor {
    pub fn new(api: Arc<dyn IndexerApi>, cfg: MonitorConfig) -> (Self, watch::Receiver<MonitorView>) {
        let (view_tx, view_rx) = watch::channel(MonitorView::default());
        let monitor = Self {
            api,
            cfg,
            state: ConnectionState::Connecting,
            snapshot: Snapshot::default(),
            is_loading: true,
            last_error: None,
            reconnect: ReconnectContext::default(),
            predicted_at: None,
            next_arrival_countdown: None,
            new_positions: HashSet::new(),
            poll_at: None,
            probe_at: None,
            marker_clear_at: None,
            view_tx,
        };
        (monitor, view_rx)
    }

    /// Drive the machine until `Shutdown` (or the command channel closes).
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<MonitorCommand>) {
        self.connect().await;

        let mut tick = tokio::time::interval_at(
            Instant::now() + Duration::from_secs(1),
            Duration::from_secs(1),
        );
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(MonitorCommand::ManualRetry) => self.manual_retry().await,
                    Some(MonitorCommand::Shutdown) | None => break,
                },
                _ = sleep_until_opt(self.poll_at), if self.poll_at.is_some() => {
                    self.poll_at = None;
                    self.poll_once().await;
                },
                _ = sleep_until_opt(self.probe_at), if self.probe_at.is_some() => {
                    self.probe_at = None;
                    self.scheduled_probe().await;
                },
                _ = sleep_until_opt(self.marker_clear_at), if self.marker_clear_at.is_some() => {
                    self.marker_clear_at = None;
                    self.new_positions.clear();
                    self.publish();
                },
                _ = tick.tick() => {
                    self.tick_countdowns(Utc::now());
                },
            }
        }
        log::debug!("monitor task stopped");
    }

    /// Full probe-then-fetch sequence: initial connection and manual retry
    /// while not offline.
    async fn connect(&mut self) {
        self.state = ConnectionState::Connecting;
        self.is_loading = true;
        self.last_error = None;
        self.publish();

        match self.probe().await {
            Ok(()) => self.enter_online().await,
            Err(e) => {
                log::error!("connection test failed: {e:#}");
                self.enter_offline(format!("Backend connection lost: {e:#}"));
            }
        }
    }

    async fn probe(&self) -> anyhow::Result<()> {
        let api = self.api.clone();
        retry_with_backoff(&self.cfg.retry, move || {
            let api = api.clone();
            async move { api.fetch_health().await }
        })
        .await
    }

    async fn enter_online(&mut self) {
        log::info!("indexer reachable, fetching data");
        self.state = ConnectionState::Online;
        self.last_error = None;
        self.reconnect = ReconnectContext::default();
        self.probe_at = None;
        self.publish();

        match self.fetch_data().await {
            Ok(()) => {
                // Prediction restarts from the just-fetched snapshot on every
                // entry to Online, including the very first page.
                self.restart_prediction();
                self.poll_at = Some(Instant::now() + self.cfg.poll_interval);
                self.publish();
            }
            Err(e) => {
                log::error!("initial data fetch failed: {e:#}");
                self.enter_offline(format!("Backend connection lost: {e:#}"));
            }
        }
    }

    fn enter_offline(&mut self, message: String) {
        log::warn!("offline: {message}");
        self.state = ConnectionState::Offline;
        self.is_loading = false;
        self.last_error = Some(message);
        self.poll_at = None;
        self.probe_at = Some(Instant::now() + self.cfg.reconnect_interval);
        self.reconnect.countdown_secs = self.cfg.reconnect_interval.as_secs();
        self.publish();
    }

    async fn poll_once(&mut self) {
        log::debug!("poll tick");
        match self.fetch_data().await {
            Ok(()) => {
                if !self.new_positions.is_empty() {
                    self.restart_prediction();
                }
                self.poll_at = Some(Instant::now() + self.cfg.poll_interval);
                self.publish();
            }
            Err(e) => {
                log::error!("periodic data update failed: {e:#}");
                self.enter_offline(format!("Backend connection lost: {e:#}"));
            }
        }
    }

    /// Fetch the latest page and tip height in parallel, diff against the
    /// prior snapshot and replace it. Marker positions are replaced wholesale
    /// and their clear deadline re-armed only when something is new.
    async fn fetch_data(&mut self) -> anyhow::Result<()> {
        self.is_loading = true;
        self.publish();

        let retry = self.cfg.retry;
        let entries_api = self.api.clone();
        let entries_fut = retry_with_backoff(&retry, move || {
            let api = entries_api.clone();
            async move { api.fetch_entries().await }
        });
        let height_api = self.api.clone();
        let height_fut = retry_with_backoff(&retry, move || {
            let api = height_api.clone();
            async move { api.fetch_tip_height().await }
        });
        let fetched = futures::future::try_join(entries_fut, height_fut).await;
        self.is_loading = false;

        let (entries, tip_height) = match fetched {
            Ok(v) => v,
            Err(e) => {
                self.publish();
                return Err(e);
            }
        };

        let fresh = differ::new_positions(&self.snapshot.entries, &entries);
        log::debug!(
            "fetched {} entries, tip {}, {} new",
            entries.len(),
            tip_height,
            fresh.len()
        );
        self.snapshot = Snapshot {
            entries,
            tip_height: Some(tip_height),
        };
        self.marker_clear_at = if fresh.is_empty() {
            None
        } else {
            Some(Instant::now() + self.cfg.marker_lifetime)
        };
        self.new_positions = fresh;
        self.last_error = None;
        self.publish();
        Ok(())
    }

    /// One scheduled reconnect probe. The attempt is counted before the call;
    /// a failed probe re-arms the deadline and resets the visible countdown.
    async fn scheduled_probe(&mut self) {
        self.reconnect.attempts += 1;
        log::info!("reconnection attempt {}", self.reconnect.attempts);
        self.publish();

        match self.probe().await {
            Ok(()) => {
                log::info!("reconnection successful, resuming data updates");
                self.enter_online().await;
            }
            Err(e) => {
                log::warn!("reconnection attempt failed: {e:#}");
                self.probe_at = Some(Instant::now() + self.cfg.reconnect_interval);
                self.reconnect.countdown_secs = self.cfg.reconnect_interval.as_secs();
                self.publish();
            }
        }
    }

    async fn manual_retry(&mut self) {
        log::info!("manual retry requested (state: {})", self.state);
        match self.state {
            // Acts like the scheduled probe firing now; dropping the armed
            // deadline first prevents a duplicate concurrent attempt. A
            // failed manual retry does not reset the attempt counter.
            ConnectionState::Offline => {
                self.probe_at = None;
                self.scheduled_probe().await;
            }
            ConnectionState::Online | ConnectionState::Connecting => {
                self.poll_at = None;
                self.connect().await;
            }
        }
    }

    fn restart_prediction(&mut self) {
        let now = Utc::now();
        let predicted = predictor::predict_next_arrival(&self.snapshot.entries, now);
        log::debug!("next entry predicted at {predicted}");
        self.predicted_at = Some(predicted);
        self.next_arrival_countdown = Some((predicted - now).num_seconds());
    }

    /// One-second tick driving both visible countdowns.
    fn tick_countdowns(&mut self, now: DateTime<Utc>) {
        let mut changed = false;

        if self.state == ConnectionState::Offline {
            // Wraps back to the full interval: the real event is the probe
            // completing on its own deadline, not this counter reaching zero.
            let full = self.cfg.reconnect_interval.as_secs();
            self.reconnect.countdown_secs = if self.reconnect.countdown_secs <= 1 {
                full
            } else {
                self.reconnect.countdown_secs - 1
            };
            changed = true;
        }

        if let Some(predicted) = self.predicted_at {
            let remaining = (predicted - now).num_seconds();
            if remaining < -OVERDUE_CUTOFF_SECS {
                log::debug!("prediction stale ({remaining}s), awaiting fresh data");
                self.predicted_at = None;
                self.next_arrival_countdown = None;
            } else {
                self.next_arrival_countdown = Some(remaining);
            }
            changed = true;
        }

        if changed {
            self.publish();
        }
    }

    fn view(&self) -> MonitorView {
        MonitorView {
            entries: self.snapshot.entries.clone(),
            tip_height: self.snapshot.tip_height,
            state: self.state,
            is_loading: self.is_loading,
            last_error: self.last_error.clone(),
            reconnect_attempts: self.reconnect.attempts,
            reconnect_countdown_secs: self.reconnect.countdown_secs,
            next_arrival_countdown_secs: self.next_arrival_countdown,
            new_positions: self.new_positions.clone(),
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;

    struct DownApi;

    #[async_trait]
    impl IndexerApi for DownApi {
        async fn fetch_health(&self) -> anyhow::Result<()> {
            Err(anyhow!("unreachable"))
        }
        async fn fetch_entries(&self) -> anyhow::Result<Vec<Entry>> {
            Err(anyhow!("unreachable"))
        }
        async fn fetch_tip_height(&self) -> anyhow::Result<u64> {
            Err(anyhow!("unreachable"))
        }
        async fn fetch_balance(&self, _: &str) -> anyhow::Result<crate::types::Balance> {
            Err(anyhow!("unreachable"))
        }
        async fn fetch_utxos(&self, _: &str) -> anyhow::Result<Vec<crate::types::Utxo>> {
            Err(anyhow!("unreachable"))
        }
    }

    fn test_monitor() -> Monitor {
        let cfg = MonitorConfig {
            poll_interval: Duration::from_secs(10),
            reconnect_interval: Duration::from_secs(10),
            retry: RetryPolicy {
                max_retries: 0,
                ..RetryPolicy::default()
            },
            marker_lifetime: Duration::from_secs(4),
        };
        Monitor::new(Arc::new(DownApi), cfg).0
    }

    #[tokio::test]
    async fn reconnect_countdown_wraps_at_one() {
        let mut m = test_monitor();
        m.state = ConnectionState::Offline;
        m.reconnect.countdown_secs = 2;
        let now = Utc::now();

        m.tick_countdowns(now);
        assert_eq!(m.reconnect.countdown_secs, 1);
        m.tick_countdowns(now);
        assert_eq!(m.reconnect.countdown_secs, 10);
    }

    #[tokio::test]
    async fn next_arrival_countdown_goes_negative_then_clears() {
        let mut m = test_monitor();
        let now = Utc::now();
        m.predicted_at = Some(now - ChronoDuration::seconds(5));

        m.tick_countdowns(now);
        assert_eq!(m.next_arrival_countdown, Some(-5));

        // More than 60s overdue: prediction is dropped entirely.
        m.tick_countdowns(now + ChronoDuration::seconds(60));
        assert_eq!(m.next_arrival_countdown, None);
        assert!(m.predicted_at.is_none());
    }

    #[tokio::test]
    async fn online_tick_leaves_reconnect_countdown_alone() {
        let mut m = test_monitor();
        m.state = ConnectionState::Online;
        m.reconnect.countdown_secs = 0;
        m.tick_countdowns(Utc::now());
        assert_eq!(m.reconnect.countdown_secs, 0);
    }
}
