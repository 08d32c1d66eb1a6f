//! Periodic refresh of the event store from the backend.
//!
//! Each tick issues a sequence-tagged fetch on its own task, so a slow
//! backend never delays the next tick; the store discards responses that
//! arrive after a newer one. Fetch failures leave the store untouched and
//! are retried on the next tick.

use crate::bus::{publish, signal_bus, Signal, SignalBus};
use arani_client::{Backend, BackendError};
use arani_core::{DetectionEvent, EventStore, RefreshOutcome, RefreshTicket};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

pub type SharedStore = Arc<RwLock<EventStore>>;

pub fn shared_store() -> SharedStore {
    Arc::new(RwLock::new(EventStore::new()))
}

/// Running poll loop. Stopping (or dropping) the handle ends the loop and
/// aborts any fetch still in flight.
pub struct PollerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop polling and wait for the loop to wind down.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = (&mut self.task).await;
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start polling: one refresh immediately, then one per `interval`.
pub fn spawn<B: Backend>(
    backend: Arc<B>,
    store: SharedStore,
    interval: Duration,
    bus: SignalBus,
) -> PollerHandle {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut inflight = JoinSet::new();
        tracing::info!(interval_ms = interval.as_millis() as u64, "poller started");

        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                _ = ticker.tick() => {
                    // Tag at issue time, not when the fetch task first runs.
                    let ticket = store.write().await.issue();
                    let backend = Arc::clone(&backend);
                    let store = Arc::clone(&store);
                    let bus = bus.clone();
                    inflight.spawn(async move {
                        if let Err(e) = refresh(&*backend, &store, ticket, &bus).await {
                            tracing::warn!(error = %e, seq = ticket.sequence(), "event poll failed; waiting for backend");
                        }
                    });
                }
                Some(_) = inflight.join_next(), if !inflight.is_empty() => {}
            }
        }

        inflight.shutdown().await;
        tracing::info!("poller stopped");
    });

    PollerHandle {
        stop: Some(stop_tx),
        task,
    }
}

/// Fetch the event log and apply it under `ticket`.
pub async fn refresh<B: Backend>(
    backend: &B,
    store: &RwLock<EventStore>,
    ticket: RefreshTicket,
    bus: &SignalBus,
) -> Result<RefreshOutcome, BackendError> {
    let events = backend.list_events().await?;
    let count = events.len();
    let outcome = store.write().await.apply(ticket, events);
    match outcome {
        RefreshOutcome::Applied => {
            tracing::trace!(seq = ticket.sequence(), events = count, "event log refreshed");
            publish(
                bus,
                Signal::FeedUpdated {
                    events: count,
                    sequence: ticket.sequence(),
                },
            );
        }
        RefreshOutcome::Stale { applied } => {
            tracing::debug!(seq = ticket.sequence(), applied, "discarding stale event poll");
        }
    }
    Ok(outcome)
}

/// Issue and apply a single refresh, outside the poll loop.
pub async fn refresh_once<B: Backend>(
    backend: &B,
    store: &RwLock<EventStore>,
    bus: &SignalBus,
) -> Result<RefreshOutcome, BackendError> {
    let ticket = store.write().await.issue();
    refresh(backend, store, ticket, bus).await
}

/// One refresh into a fresh store, returning what it holds afterwards.
/// Used by one-shot commands that never mount a dashboard.
pub async fn snapshot_once<B: Backend>(backend: &B) -> Result<Arc<[DetectionEvent]>, BackendError> {
    let store = RwLock::new(EventStore::new());
    refresh_once(backend, &store, &signal_bus()).await?;
    let events = store.read().await.snapshot();
    Ok(events)
}
