use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ApiError, NovaApi, Preferences};

/// Shared request counter. Every preferences fetch, whether from the poller
/// or from a refresh after a send, takes the next number before it starts.
#[derive(Debug, Clone, Default)]
pub struct RequestSequence(Arc<AtomicU64>);

impl RequestSequence {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreferencesUpdate {
    pub seq: u64,
    pub preferences: Preferences,
}

/// Last known learned preferences.
#[derive(Debug, Default)]
pub struct PreferencesPanel {
    preferences: Preferences,
    applied_seq: Option<u64>,
    sequence: RequestSequence,
}

impl PreferencesPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sequence(&self) -> RequestSequence {
        self.sequence.clone()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn is_loaded(&self) -> bool {
        self.applied_seq.is_some()
    }

    /// Categories that have at least one value, in sorted order.
    pub fn visible_categories(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.preferences
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(category, values)| (category.as_str(), values.as_slice()))
    }

    pub fn has_values(&self) -> bool {
        self.visible_categories().next().is_some()
    }

    /// Store `update` unless a newer response was already applied.
    /// Returns false when the update was stale.
    pub fn apply(&mut self, update: PreferencesUpdate) -> bool {
        if self.applied_seq.is_some_and(|applied| update.seq <= applied) {
            debug!(seq = update.seq, "dropping stale preferences response");
            return false;
        }
        self.applied_seq = Some(update.seq);
        self.preferences = update.preferences;
        true
    }

    pub async fn refresh(&mut self, api: &dyn NovaApi) -> Result<bool, ApiError> {
        let seq = self.sequence.next();
        let preferences = api.preferences().await?;
        Ok(self.apply(PreferencesUpdate { seq, preferences }))
    }
}

/// Background task that re-fetches preferences on a fixed interval.
///
/// The first fetch happens immediately. Failures are logged and skipped so
/// the previously applied state stays on screen.
pub struct PreferencesPoller {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PreferencesPoller {
    pub fn spawn(
        api: Arc<dyn NovaApi>,
        sequence: RequestSequence,
        period: Duration,
        updates: mpsc::Sender<PreferencesUpdate>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let seq = sequence.next();
                let result = tokio::select! {
                    _ = token.cancelled() => break,
                    result = api.preferences() => result,
                };
                match result {
                    Ok(preferences) => {
                        let update = PreferencesUpdate { seq, preferences };
                        tokio::select! {
                            _ = token.cancelled() => break,
                            sent = updates.send(update) => {
                                if sent.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Err(err) => warn!(error = %err, "background preferences refresh failed"),
                }
            }
            debug!("preferences poller stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PreferencesPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
