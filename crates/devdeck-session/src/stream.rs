//! Dual-mode log delivery.
//!
//! Per log source the controller first asks the host for a live push
//! stream; when the host reports the stream already active or refuses, it
//! falls back silently to pull mode — a timed re-fetch of recent history —
//! so the viewer sees a uniform `entries` view either way. Every
//! subscription is a scoped resource: subscribe pairs with a guaranteed
//! teardown on mode switch, channel switch, source removal, or shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use devdeck_core::domain::{DeliveryMode, LogChannel};
use devdeck_core::ports::ProcessHostPort;
use tokio::sync::RwLock;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::logs::LogStore;

/// Active delivery state for one source.
struct Subscription {
    channel: LogChannel,
    mode: DeliveryMode,
    /// Cancels the poll task in pull mode; unused but kept armed in push
    /// mode so teardown is uniform.
    cancel: CancellationToken,
    /// Whether a host-side stream is open and must be stopped on teardown.
    live: bool,
}

/// Chooses and operates the delivery mode for each subscribed log source.
pub struct StreamController {
    host: Arc<dyn ProcessHostPort>,
    store: Arc<LogStore>,
    poll_interval: Duration,
    fetch_limit: usize,
    subs: RwLock<HashMap<String, Subscription>>,
}

impl StreamController {
    /// Create a controller feeding `store` from `host`.
    pub fn new(
        host: Arc<dyn ProcessHostPort>,
        store: Arc<LogStore>,
        poll_interval: Duration,
        fetch_limit: usize,
    ) -> Self {
        Self {
            host,
            store,
            poll_interval,
            fetch_limit,
            subs: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to `(source, channel)`, replacing any existing
    /// subscription for the source. Returns the mode actually in effect.
    pub async fn subscribe(&self, source: &str, channel: LogChannel) -> DeliveryMode {
        self.close(source).await;
        self.open(source, channel).await
    }

    /// Toggle the delivery mode at runtime.
    ///
    /// Tears down the active subscription, performs an immediate history
    /// fetch so no gap appears to the viewer, then resubscribes in the
    /// requested mode. Returns the resulting mode (push requests still
    /// degrade to pull when the host refuses), or `None` when the source
    /// has no subscription.
    pub async fn set_mode(&self, source: &str, mode: DeliveryMode) -> Option<DeliveryMode> {
        let channel = {
            let subs = self.subs.read().await;
            subs.get(source).map(|sub| sub.channel)?
        };
        self.close(source).await;
        self.fetch_once(source, channel).await;

        let mode = match mode {
            DeliveryMode::Push => self.open(source, channel).await,
            DeliveryMode::Pull => self.open_pull(source, channel).await,
        };
        Some(mode)
    }

    /// Switch the channel viewed for `source`.
    ///
    /// Stops the current subscription, clears the local buffers so no entry
    /// from the previous channel remains visible, then resumes on the new
    /// channel in the mode that was in effect.
    pub async fn switch_channel(&self, source: &str, channel: LogChannel) -> DeliveryMode {
        let previous = {
            let subs = self.subs.read().await;
            subs.get(source).map(|sub| (sub.channel, sub.mode))
        };
        self.close(source).await;

        if let Some((old_channel, _)) = previous {
            self.store.clear(source, old_channel);
        }
        self.store.clear(source, channel);

        match previous {
            Some((_, DeliveryMode::Pull)) => self.open_pull(source, channel).await,
            _ => self.open(source, channel).await,
        }
    }

    /// Delivery mode currently in effect for `source`.
    pub async fn mode(&self, source: &str) -> Option<DeliveryMode> {
        let subs = self.subs.read().await;
        subs.get(source).map(|sub| sub.mode)
    }

    /// Tear down the subscription for `source`: cancel the poll timer and
    /// stop any host-side stream. Safe to call for unsubscribed sources.
    pub async fn close(&self, source: &str) {
        let sub = {
            let mut subs = self.subs.write().await;
            subs.remove(source)
        };
        let Some(sub) = sub else { return };

        sub.cancel.cancel();
        if sub.live {
            if let Err(error) = self.host.stop_log_stream(source, sub.channel).await {
                warn!(source = %source, error = %error, "Failed to stop host log stream");
            }
        }
        debug!(source = %source, "Log subscription closed");
    }

    /// Tear down every subscription (component disposal).
    pub async fn close_all(&self) {
        let sources: Vec<String> = {
            let subs = self.subs.read().await;
            subs.keys().cloned().collect()
        };
        for source in sources {
            self.close(&source).await;
        }
    }

    /// Open a subscription push-first, degrading silently to pull.
    async fn open(&self, source: &str, channel: LogChannel) -> DeliveryMode {
        match self.host.start_log_stream(source, channel).await {
            Ok(true) => {
                debug!(source = %source, channel = %channel, "Live log stream started");
                let mut subs = self.subs.write().await;
                subs.insert(
                    source.to_string(),
                    Subscription {
                        channel,
                        mode: DeliveryMode::Push,
                        cancel: CancellationToken::new(),
                        live: true,
                    },
                );
                DeliveryMode::Push
            }
            Ok(false) => {
                debug!(source = %source, "Stream already active or refused; using pull");
                self.open_pull(source, channel).await
            }
            Err(error) => {
                debug!(source = %source, error = %error, "Stream start failed; using pull");
                self.open_pull(source, channel).await
            }
        }
    }

    /// Start a pull-mode poll task. The first fetch happens immediately;
    /// afterwards the buffer is refreshed every poll interval.
    async fn open_pull(&self, source: &str, channel: LogChannel) -> DeliveryMode {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let host = Arc::clone(&self.host);
        let store = Arc::clone(&self.store);
        let poll_interval = self.poll_interval;
        let fetch_limit = self.fetch_limit;
        let source_owned = source.to_string();

        tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        match host.fetch_log_history(&source_owned, channel, fetch_limit).await {
                            Ok(entries) => store.replace(&source_owned, channel, entries),
                            Err(error) => {
                                warn!(source = %source_owned, error = %error, "Log history fetch failed");
                            }
                        }
                    }
                }
            }
            debug!(source = %source_owned, "Poll task exiting");
        });

        let mut subs = self.subs.write().await;
        subs.insert(
            source.to_string(),
            Subscription {
                channel,
                mode: DeliveryMode::Pull,
                cancel,
                live: false,
            },
        );
        DeliveryMode::Pull
    }

    /// One-shot history refresh (used when toggling modes).
    async fn fetch_once(&self, source: &str, channel: LogChannel) {
        match self
            .host
            .fetch_log_history(source, channel, self.fetch_limit)
            .await
        {
            Ok(entries) => self.store.replace(source, channel, entries),
            Err(error) => {
                warn!(source = %source, error = %error, "Log history fetch failed");
            }
        }
    }
}
