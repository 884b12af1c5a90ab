// ── Hub abstraction ──
//
// Full lifecycle management for one iMatrix account: authentication,
// discovery, per-entity background polling, and teardown.

use std::sync::Arc;
use std::time::Duration;

use imatrix_api::ImatrixClient;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::HubConfig;
use crate::discovery;
use crate::error::CoreError;
use crate::model::{Entity, PollOutcome, Thing};
use crate::store::DataStore;

// ── HubState ─────────────────────────────────────────────────────

/// Lifecycle state of a hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubState {
    Unloaded,
    SettingUp,
    Running,
    Failed,
}

// ── Hub ──────────────────────────────────────────────────────────

/// Runtime for one account.
///
/// Cheaply cloneable via `Arc<HubInner>`. Owns the shared API client, the
/// entity store and one poll task per entity.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    config: HubConfig,
    store: Arc<DataStore>,
    state: watch::Sender<HubState>,
    cancel: CancellationToken,
    /// Child token for the current setup; cancelled on unload, replaced on
    /// the next setup.
    cancel_child: Mutex<CancellationToken>,
    client: Mutex<Option<Arc<ImatrixClient>>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for HubInner {
    /// Poll tasks only hold the store and client, so the last `Hub` going
    /// away must stop them.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Hub {
    /// Create a hub. Does NOT contact the API; call [`setup()`](Self::setup).
    pub fn new(config: HubConfig) -> Self {
        let (state, _) = watch::channel(HubState::Unloaded);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(HubInner {
                config,
                store: Arc::new(DataStore::new()),
                state,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                client: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Log in, run one discovery pass, populate the store and start
    /// polling.
    ///
    /// Calling this on a hub that is already running (or mid-setup) is a
    /// no-op. On failure the store is left empty and the state is
    /// [`Failed`](HubState::Failed); check [`CoreError::is_retryable`] to
    /// decide between retrying later and asking for new credentials.
    pub async fn setup(&self) -> Result<(), CoreError> {
        let claimed = self.inner.state.send_if_modified(|state| {
            if matches!(state, HubState::Running | HubState::SettingUp) {
                false
            } else {
                *state = HubState::SettingUp;
                true
            }
        });
        if !claimed {
            warn!(email = %self.inner.config.email, "hub already set up, ignoring");
            return Ok(());
        }

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let client = match self.connect_and_discover().await {
            Ok(client) => client,
            Err(e) => {
                self.inner.store.clear();
                self.inner.state.send_replace(HubState::Failed);
                return Err(e);
            }
        };
        *self.inner.client.lock().await = Some(Arc::clone(&client));

        let period = self.inner.config.poll_interval;
        if !period.is_zero() {
            let mut handles = self.inner.task_handles.lock().await;
            for entity in self.inner.store.entities_snapshot().iter() {
                handles.push(tokio::spawn(entity_poll_task(
                    Arc::clone(&self.inner.store),
                    Arc::clone(&client),
                    entity.unique_id.clone(),
                    period,
                    child.clone(),
                )));
            }
            debug!(tasks = handles.len(), ?period, "poll tasks spawned");
        }

        self.inner.state.send_replace(HubState::Running);
        info!(
            entities = self.inner.store.entity_count(),
            "hub running"
        );
        Ok(())
    }

    /// Set up, retrying transient failures every `setup_retry_delay` until
    /// it succeeds, fails for good, or `cancel` fires.
    pub async fn setup_with_retry(&self, cancel: &CancellationToken) -> Result<(), CoreError> {
        let delay = self.inner.config.setup_retry_delay;
        loop {
            match self.setup().await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, retry_in = ?delay, "setup failed, will retry");
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(e),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Stop polling, drop the session and clear the store.
    ///
    /// In-flight polls are abandoned.
    pub async fn unload(&self) {
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            handle.abort();
            let _ = handle.await;
        }
        drop(handles);

        if let Some(client) = self.inner.client.lock().await.take() {
            client.logout();
        }
        self.inner.store.clear();
        self.inner.state.send_replace(HubState::Unloaded);
        debug!("hub unloaded");
    }

    /// Unload, then set up again from scratch.
    pub async fn reload(&self) -> Result<(), CoreError> {
        self.unload().await;
        self.setup().await
    }

    /// One-shot: set up without polling, run closure, unload.
    pub async fn oneshot<F, Fut, T>(config: HubConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Hub) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.poll_interval = Duration::ZERO;

        let hub = Hub::new(cfg);
        hub.setup().await?;
        let result = f(hub.clone()).await;
        hub.unload().await;
        result
    }

    // ── Polling ──────────────────────────────────────────────────

    /// Fetch latest values for the entity's thing and recompute its value.
    ///
    /// Never returns an error: fetch failures leave the previous value in
    /// place and report [`PollOutcome::Failed`].
    pub async fn poll_entity(&self, unique_id: &str) -> PollOutcome {
        let Some(client) = self.client().await else {
            debug!(entity = unique_id, "poll skipped, hub not set up");
            return PollOutcome::Failed;
        };
        poll_once(&self.inner.store, &client, unique_id).await
    }

    // ── State observation ────────────────────────────────────────

    pub fn state(&self) -> watch::Receiver<HubState> {
        self.inner.state.subscribe()
    }

    pub fn current_state(&self) -> HubState {
        *self.inner.state.borrow()
    }

    pub fn entities_snapshot(&self) -> Arc<Vec<Arc<Entity>>> {
        self.inner.store.entities_snapshot()
    }

    pub fn things_snapshot(&self) -> Arc<Vec<Arc<Thing>>> {
        self.inner.store.things_snapshot()
    }

    pub fn entity(&self, unique_id: &str) -> Result<Arc<Entity>, CoreError> {
        self.inner
            .store
            .entity(unique_id)
            .ok_or_else(|| CoreError::EntityNotFound {
                unique_id: unique_id.to_owned(),
            })
    }

    /// Shared API client of the current setup.
    pub async fn client(&self) -> Option<Arc<ImatrixClient>> {
        self.inner.client.lock().await.clone()
    }

    // ── Private helpers ──────────────────────────────────────────

    async fn connect_and_discover(&self) -> Result<Arc<ImatrixClient>, CoreError> {
        let config = &self.inner.config;
        let client = ImatrixClient::new(
            config.base_url.as_str(),
            config.credentials(),
            &config.transport(),
        )?;

        client.login().await?;
        let discovered = discovery::discover(&client).await?;
        self.inner.store.apply_discovery(&discovered);

        Ok(Arc::new(client))
    }
}

// ── Background tasks ─────────────────────────────────────────────

async fn poll_once(store: &DataStore, client: &ImatrixClient, unique_id: &str) -> PollOutcome {
    let Some(entity) = store.entity(unique_id) else {
        debug!(entity = unique_id, "poll skipped, entity gone");
        return PollOutcome::Failed;
    };

    let latest = match client.latest_values(&entity.thing_sn).await {
        Ok(latest) => latest,
        Err(e) => {
            warn!(entity = unique_id, error = %e, "poll failed, keeping previous value");
            return PollOutcome::Failed;
        }
    };

    let outcome = store
        .update_entity(unique_id, |e| e.apply(&latest))
        .unwrap_or(PollOutcome::Failed);
    if outcome == PollOutcome::Rejected {
        debug!(entity = unique_id, "update rejected, keeping previous value");
    }
    outcome
}

/// A slow poll pushes the next tick back instead of firing catch-up
/// requests.
fn poll_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Poll one entity on its own interval until cancelled.
async fn entity_poll_task(
    store: Arc<DataStore>,
    client: Arc<ImatrixClient>,
    unique_id: String,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = poll_interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let outcome = poll_once(&store, &client, &unique_id).await;
                trace!(entity = %unique_id, %outcome, "poll tick");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn overdue_tick_is_followed_by_a_full_period() {
        let period = Duration::from_secs(30);
        let mut interval = poll_interval(period);
        interval.tick().await;

        // Simulate a poll that overran three periods.
        tokio::time::advance(Duration::from_secs(95)).await;
        interval.tick().await;
        let after_overdue = Instant::now();
        interval.tick().await;

        assert_eq!(after_overdue.elapsed(), period);
    }
}
