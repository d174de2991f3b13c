use regwatch_core::models::{CompanyNumber, CompanySnapshot};
use regwatch_core::registry::{FetchError, RegistrySource};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

type Listener = Arc<dyn Fn(Arc<CompanySnapshot>) + Send + Sync>;
type ListenerSet = Mutex<Vec<(u64, Listener)>>;

/// Errors from the first, setup-gating refresh.
///
/// Auth failures get their own variant so callers can offer a credential
/// repair path instead of a generic retry.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("authentication failed: {0}")]
    AuthFailed(FetchError),
    #[error("initial refresh failed: {0}")]
    Fetch(FetchError),
}

/// Result of one steady-state poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Snapshot replaced, subscribers notified.
    Updated,
    /// Transient failure; the previous snapshot stays visible.
    Stale,
    /// Credentials rejected mid-lifetime; polling must stop.
    AuthFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    Uninitialized,
    Ready,
    /// Still serving the last good snapshot, but the most recent poll failed.
    Degraded { last_error: String },
    AuthFailed,
}

impl CoordinatorState {
    /// True while a snapshot is (or may be) served, fresh or stale.
    pub fn is_serving(&self) -> bool {
        matches!(
            self,
            CoordinatorState::Ready | CoordinatorState::Degraded { .. }
        )
    }
}

/// Caching poll coordinator for one watched company.
///
/// Owns the only mutable copy of the snapshot; replacement is a whole-document
/// swap, so readers never observe a partial update. All fetch activity runs on
/// the single timer task spawned by [`PollCoordinator::spawn`] — single-flight
/// by construction.
pub struct PollCoordinator {
    source: Arc<dyn RegistrySource>,
    company_number: CompanyNumber,
    interval: Duration,
    snapshot: RwLock<Option<Arc<CompanySnapshot>>>,
    state: RwLock<CoordinatorState>,
    listeners: Arc<ListenerSet>,
    auth_listener: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
    next_listener_id: AtomicU64,
}

impl PollCoordinator {
    pub fn new(
        source: Arc<dyn RegistrySource>,
        company_number: CompanyNumber,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            company_number,
            interval,
            snapshot: RwLock::new(None),
            state: RwLock::new(CoordinatorState::Uninitialized),
            listeners: Arc::new(Mutex::new(Vec::new())),
            auth_listener: Mutex::new(None),
            next_listener_id: AtomicU64::new(1),
        }
    }

    pub fn from_minutes(
        source: Arc<dyn RegistrySource>,
        company_number: CompanyNumber,
        minutes: u64,
    ) -> Self {
        Self::new(source, company_number, Duration::from_secs(minutes * 60))
    }

    pub fn company_number(&self) -> &CompanyNumber {
        &self.company_number
    }

    /// The last successfully fetched snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<CompanySnapshot>> {
        self.snapshot.read().unwrap().clone()
    }

    pub fn state(&self) -> CoordinatorState {
        self.state.read().unwrap().clone()
    }

    /// Register a callback fired after every successful snapshot replacement.
    /// Dropping the returned guard deregisters it. Callbacks run on the poll
    /// task and must not block.
    pub fn subscribe(
        &self,
        listener: impl Fn(Arc<CompanySnapshot>) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Register the auth-failure channel: fired once whenever a refresh or
    /// tick hits an authentication failure.
    pub fn set_auth_listener(&self, listener: impl Fn() + Send + Sync + 'static) {
        *self.auth_listener.lock().unwrap() = Some(Box::new(listener));
    }

    /// First fetch, performed before the watch is considered up. Any failure
    /// here is fatal to setup; the cache stays empty.
    pub async fn refresh(&self) -> Result<(), SetupError> {
        match self.source.company_profile(&self.company_number).await {
            Ok(document) => {
                self.apply(document);
                Ok(())
            }
            Err(err) if err.is_auth() => {
                self.fail_auth();
                Err(SetupError::AuthFailed(err))
            }
            Err(err) => Err(SetupError::Fetch(err)),
        }
    }

    /// One steady-state poll. On failure the cached snapshot is left as-is
    /// and subscribers are not notified.
    pub async fn tick(&self) -> TickOutcome {
        match self.source.company_profile(&self.company_number).await {
            Ok(document) => {
                self.apply(document);
                tracing::debug!(company = %self.company_number, "company profile refreshed");
                TickOutcome::Updated
            }
            Err(err) if err.is_auth() => {
                tracing::error!(
                    company = %self.company_number,
                    "authentication failed during poll; stopping watch"
                );
                self.fail_auth();
                TickOutcome::AuthFailed
            }
            Err(err) => {
                tracing::warn!(
                    company = %self.company_number,
                    error = %err,
                    "poll failed; keeping last snapshot"
                );
                *self.state.write().unwrap() = CoordinatorState::Degraded {
                    last_error: err.to_string(),
                };
                TickOutcome::Stale
            }
        }
    }

    /// Start the poll timer. The first interval elapses before the first
    /// tick; callers run [`PollCoordinator::refresh`] themselves beforehand.
    pub fn spawn(self: Arc<Self>) -> PollHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let coordinator = self;
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(coordinator.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {}
                }
                // Shutdown during the in-flight fetch drops the future, so a
                // late response is never applied after teardown.
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    outcome = coordinator.tick() => {
                        if outcome == TickOutcome::AuthFailed {
                            break;
                        }
                    }
                }
            }
        });
        PollHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }

    fn apply(&self, document: CompanySnapshot) {
        let snapshot = Arc::new(document);
        *self.snapshot.write().unwrap() = Some(Arc::clone(&snapshot));
        *self.state.write().unwrap() = CoordinatorState::Ready;

        // Snapshot the listener set so callbacks run without the lock held.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(Arc::clone(&snapshot));
        }
    }

    fn fail_auth(&self) {
        *self.state.write().unwrap() = CoordinatorState::AuthFailed;
        if let Some(listener) = self.auth_listener.lock().unwrap().as_ref() {
            listener();
        }
    }
}

/// Subscription guard; dropping it deregisters the listener.
pub struct Subscription {
    id: u64,
    listeners: Weak<ListenerSet>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap()
                .retain(|(listener_id, _)| *listener_id != self.id);
        }
    }
}

/// Handle to a running poll task.
pub struct PollHandle {
    shutdown: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Stop the timer and wait for the poll task to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(true)
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
