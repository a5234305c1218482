//! Polling dispatcher delivering ledger entries to registered listeners.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ledger::{EventLedger, LedgerEntry};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::listener::ListenerError;
use crate::registry::ListenerRegistry;

/// Dispatcher tuning knobs.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sleep between empty poll cycles.
    pub poll_interval: Duration,

    /// Maximum entries claimed per poll cycle.
    pub batch_size: usize,

    /// Total delivery attempts before an entry is dead-lettered.
    pub max_attempts: u32,

    /// Backoff after the first failed attempt; doubles per attempt.
    pub base_backoff: Duration,

    /// Upper bound on the computed backoff.
    pub max_backoff: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            batch_size: 32,
            max_attempts: 5,
            base_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Delivers ledger entries to listeners asynchronously.
///
/// Workers poll the ledger, claim entries exclusively, and invoke every
/// listener registered for the entry's event type. All listeners succeeding
/// marks the entry dispatched; any failure marks it failed and schedules a
/// retry with exponential backoff, up to the configured ceiling. Exhausted
/// entries stay `Failed` for operator inspection, never silently dropped.
#[derive(Clone)]
pub struct EventDispatcher<L: EventLedger> {
    ledger: L,
    registry: Arc<ListenerRegistry>,
    config: DispatcherConfig,
}

impl<L: EventLedger + Clone + 'static> EventDispatcher<L> {
    /// Creates a new dispatcher over the given ledger and listener registry.
    pub fn new(ledger: L, registry: ListenerRegistry, config: DispatcherConfig) -> Self {
        Self {
            ledger,
            registry: Arc::new(registry),
            config,
        }
    }

    /// Returns the dispatcher configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Runs a single poll cycle: claim a batch and deliver each entry.
    ///
    /// Returns the number of entries processed. Exposed for deterministic
    /// tests and for callers that want to pump delivery manually.
    #[tracing::instrument(skip(self))]
    pub async fn poll_once(&self) -> Result<usize> {
        let now = Utc::now();
        let batch = self.ledger.claim_batch(now, self.config.batch_size).await?;
        let count = batch.len();

        for entry in &batch {
            self.dispatch_entry(entry).await?;
        }

        Ok(count)
    }

    /// Drives the dispatcher until every pending entry has resolved.
    ///
    /// Test helper: loops poll cycles, sleeping through retry backoff,
    /// until a cycle claims nothing and nothing is pending.
    pub async fn drain(&self) -> Result<()> {
        loop {
            let processed = self.poll_once().await?;
            if processed == 0 {
                if self.ledger.pending_count().await? == 0 {
                    return Ok(());
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }
    }

    /// Spawns `workers` polling tasks and returns a shutdown handle.
    pub fn start(&self, workers: usize) -> DispatcherHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = (0..workers)
            .map(|worker| {
                let dispatcher = self.clone();
                let mut shutdown = shutdown_rx.clone();
                tokio::spawn(async move {
                    tracing::debug!(worker, "dispatch worker started");
                    loop {
                        if *shutdown.borrow() {
                            break;
                        }

                        let processed = match dispatcher.poll_once().await {
                            Ok(count) => count,
                            Err(e) => {
                                tracing::error!(worker, error = %e, "poll cycle failed");
                                0
                            }
                        };

                        if processed == 0 {
                            tokio::select! {
                                _ = tokio::time::sleep(dispatcher.config.poll_interval) => {}
                                _ = shutdown.changed() => {}
                            }
                        }
                    }
                    tracing::debug!(worker, "dispatch worker stopped");
                })
            })
            .collect();

        DispatcherHandle {
            shutdown: shutdown_tx,
            tasks,
        }
    }

    /// Delivers one claimed entry to its listeners and records the outcome.
    async fn dispatch_entry(&self, entry: &LedgerEntry) -> Result<()> {
        let listeners = self.registry.listeners_for(&entry.event_type);
        if listeners.is_empty() {
            tracing::debug!(
                event_type = %entry.event_type,
                event_id = %entry.event_id,
                "no listeners registered, acknowledging entry"
            );
            self.ledger.mark_dispatched(entry.event_id).await?;
            return Ok(());
        }

        let started = std::time::Instant::now();
        for listener in listeners {
            if let Err(error) = listener.handle(entry).await {
                self.record_failure(entry, listener.name(), error).await?;
                metrics::counter!("dispatcher_entries_failed").increment(1);
                return Ok(());
            }
        }

        self.ledger.mark_dispatched(entry.event_id).await?;
        metrics::counter!("dispatcher_entries_dispatched").increment(1);
        metrics::histogram!("dispatcher_dispatch_seconds")
            .record(started.elapsed().as_secs_f64());
        Ok(())
    }

    async fn record_failure(
        &self,
        entry: &LedgerEntry,
        listener: &'static str,
        error: ListenerError,
    ) -> Result<()> {
        let reason = format!("{listener}: {error}");

        let retry_at = match error {
            ListenerError::Fatal(_) => None,
            ListenerError::Transient(_) => {
                if entry.attempts + 1 >= self.config.max_attempts {
                    None
                } else {
                    let backoff = self.backoff_for(entry.attempts);
                    Some(
                        Utc::now()
                            + chrono::Duration::from_std(backoff)
                                .unwrap_or_else(|_| chrono::Duration::seconds(30)),
                    )
                }
            }
        };

        if retry_at.is_none() {
            tracing::error!(
                event_id = %entry.event_id,
                event_type = %entry.event_type,
                attempts = entry.attempts + 1,
                reason,
                "entry dead-lettered"
            );
        } else {
            tracing::warn!(
                event_id = %entry.event_id,
                event_type = %entry.event_type,
                attempts = entry.attempts + 1,
                reason,
                "delivery failed, retry scheduled"
            );
        }

        self.ledger
            .mark_failed(entry.event_id, &reason, retry_at)
            .await?;
        Ok(())
    }

    /// Exponential backoff for the next attempt after `attempts` failures,
    /// capped at `max_backoff`.
    fn backoff_for(&self, attempts: u32) -> Duration {
        let shift = attempts.min(16);
        self.config
            .base_backoff
            .checked_mul(1 << shift)
            .map(|d| d.min(self.config.max_backoff))
            .unwrap_or(self.config.max_backoff)
    }
}

/// Handle to running dispatch workers.
pub struct DispatcherHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl DispatcherHandle {
    /// Signals all workers to stop and waits for them to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}
