//! The campaign SDK service object.
//!
//! A [`CampaignSdk`] owns the polled campaign list, the in-memory dismissal
//! set and the event hub. It is constructed explicitly by the application's
//! composition root and cloned cheaply into whatever needs it; separate
//! instances share nothing.

mod poller;
mod state;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::analytics::{
    campaign_properties, dismissal_properties, AnalyticsSink, TracingSink, CAMPAIGN_ACTION,
    CAMPAIGN_DISMISSED, CAMPAIGN_IMPRESSION,
};
use crate::campaign::{active_only, Campaign, ComponentKind};
use crate::client::{CampaignClient, CampaignSource, ClientError};
use crate::config::Config;
use crate::events::{Callback, EventHub, EventKind, SdkEvent};
use crate::selector;
use crate::storage::{open_store, DismissalStore, KeyValueStore, StorageError};

pub use state::{FetchHealth, PollState};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct CampaignSdk {
    inner: Arc<SdkInner>,
}

struct SdkInner {
    source: Arc<dyn CampaignSource>,
    dismissals: DismissalStore,
    analytics: Arc<dyn AnalyticsSink>,
    hub: EventHub,
    poll_interval: Duration,
    state: Mutex<SdkState>,
    poller: Mutex<Option<JoinHandle<()>>>,
    /// Serializes writes to the dismissal store across handles.
    persist: AsyncMutex<()>,
}

struct SdkState {
    phase: PollState,
    app_key: Option<String>,
    campaigns: Arc<[Campaign]>,
    dismissed: HashSet<String>,
    health: FetchHealth,
    /// Sequence number of the most recently started fetch.
    fetch_issued: u64,
    /// Sequence number of the newest fetch whose result was applied.
    fetch_applied: u64,
    /// Bumped by `teardown`; in-flight work from an older generation is dropped.
    generation: u64,
}

impl SdkState {
    fn new() -> Self {
        Self {
            phase: PollState::Uninitialized,
            app_key: None,
            campaigns: Arc::from(Vec::new()),
            dismissed: HashSet::new(),
            health: FetchHealth::default(),
            fetch_issued: 0,
            fetch_applied: 0,
            generation: 0,
        }
    }

    fn updated_event(&self) -> SdkEvent {
        SdkEvent::CampaignsUpdated {
            campaigns: self.campaigns.clone(),
        }
    }
}

impl CampaignSdk {
    pub fn new(source: Arc<dyn CampaignSource>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(SdkInner {
                source,
                dismissals: DismissalStore::new(storage),
                analytics: Arc::new(TracingSink),
                hub: EventHub::new(),
                poll_interval: DEFAULT_POLL_INTERVAL,
                state: Mutex::new(SdkState::new()),
                poller: Mutex::new(None),
                persist: AsyncMutex::new(()),
            }),
        }
    }

    /// Wire an SDK from configuration: HTTP client plus the configured
    /// storage adapter.
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let client = CampaignClient::new(&config.client.endpoint)?;
        let storage = open_store(&config.storage);
        Ok(Self::new(Arc::new(client), storage)
            .with_poll_interval(Duration::from_secs(config.client.poll_interval_seconds)))
    }

    /// Replace the analytics sink. Only effective before the handle is cloned.
    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.analytics = analytics,
            None => tracing::warn!("with_analytics ignored: SDK handle is already shared"),
        }
        self
    }

    /// Set the polling period. Only effective before the handle is cloned.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.poll_interval = interval,
            None => tracing::warn!(
                requested_secs = interval.as_secs_f64(),
                "with_poll_interval ignored: SDK handle is already shared"
            ),
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    /// Start the SDK: load dismissals, fetch once, then poll on a fixed
    /// interval.
    ///
    /// Calling this while already polling does nothing. After `stop` it
    /// resumes polling; after `teardown` it starts from scratch.
    pub async fn initialize(&self, key: &str) {
        let generation = {
            let mut state = self.inner.state.lock();
            if state.phase == PollState::Polling {
                tracing::debug!("SDK already initialized, ignoring");
                return;
            }
            state.phase = PollState::Polling;
            state.app_key = Some(key.to_string());
            state.generation
        };
        tracing::info!(key, interval_secs = self.inner.poll_interval.as_secs_f64(), "Initializing campaign SDK");

        let dismissals = self.inner.dismissals.clone();
        let loaded = match run_storage(move || dismissals.try_load()).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load dismissed campaigns");
                HashSet::new()
            }
        };
        {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                return;
            }
            state.dismissed.extend(loaded);
        }

        self.refresh().await;

        let state = self.inner.state.lock();
        if state.generation != generation || state.phase != PollState::Polling {
            return;
        }
        let handle = tokio::spawn(poller::poll_loop(
            Arc::downgrade(&self.inner),
            self.inner.poll_interval,
        ));
        if let Some(previous) = self.inner.poller.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Fetch once and publish the result if it differs from what is held.
    ///
    /// Comparison is structural and order-sensitive: the same campaigns in a
    /// different order count as a change. A failed fetch counts as an empty
    /// list. When fetches overlap, a result older than one already applied
    /// is discarded. Returns whether `CampaignsUpdated` was emitted.
    pub async fn refresh(&self) -> bool {
        let (generation, ticket) = {
            let mut state = self.inner.state.lock();
            state.fetch_issued += 1;
            (state.generation, state.fetch_issued)
        };
        let fetched = self.inner.source.fetch_campaigns().await;

        let event = {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                return false;
            }
            if ticket < state.fetch_applied {
                tracing::debug!(ticket, applied = state.fetch_applied, "Discarding stale fetch result");
                return false;
            }
            state.fetch_applied = ticket;
            let campaigns = match fetched {
                Ok(campaigns) => {
                    state.health.record_success();
                    active_only(campaigns)
                }
                Err(e) => {
                    state.health.record_failure(&e);
                    tracing::warn!(
                        error = %e,
                        consecutive_failures = state.health.consecutive_failures,
                        "Campaign fetch failed, treating as no campaigns"
                    );
                    Vec::new()
                }
            };
            if state.campaigns[..] == campaigns[..] {
                tracing::trace!("Campaign list unchanged");
                return false;
            }
            state.campaigns = Arc::from(campaigns);
            tracing::info!(count = state.campaigns.len(), "Campaign list updated");
            state.updated_event()
        };

        self.inner.hub.emit(&event);
        true
    }

    /// Cancel the polling timer but keep campaigns and subscribers.
    pub fn stop(&self) {
        self.abort_poller();
        let mut state = self.inner.state.lock();
        if state.phase == PollState::Polling {
            state.phase = PollState::Stopped;
            tracing::info!("Campaign polling stopped");
        }
    }

    /// Cancel polling, drop every subscriber and forget all in-memory state.
    pub fn teardown(&self) {
        self.abort_poller();
        self.inner.hub.clear();
        let mut state = self.inner.state.lock();
        let generation = state.generation + 1;
        *state = SdkState::new();
        state.generation = generation;
        tracing::debug!("Campaign SDK torn down");
    }

    fn abort_poller(&self) {
        if let Some(handle) = self.inner.poller.lock().take() {
            handle.abort();
        }
    }

    pub fn state(&self) -> PollState {
        self.inner.state.lock().phase
    }

    pub fn app_key(&self) -> Option<String> {
        self.inner.state.lock().app_key.clone()
    }

    pub fn health(&self) -> FetchHealth {
        self.inner.state.lock().health.clone()
    }

    /// Active campaigns as of the last fetch.
    pub fn campaigns(&self) -> Arc<[Campaign]> {
        self.inner.state.lock().campaigns.clone()
    }

    pub fn is_dismissed(&self, id: &str) -> bool {
        self.inner.state.lock().dismissed.contains(id)
    }

    // -- Selectors ---------------------------------------------------------

    pub fn popup_campaign(&self, screen: &str) -> Option<Campaign> {
        let state = self.inner.state.lock();
        selector::select_popup(&state.campaigns, &state.dismissed, screen).cloned()
    }

    pub fn permission_prompt_campaign(&self, screen: &str) -> Option<Campaign> {
        let state = self.inner.state.lock();
        selector::select_permission_prompt(&state.campaigns, &state.dismissed, screen).cloned()
    }

    pub fn inline_component(&self, screen: &str) -> Option<Campaign> {
        let state = self.inner.state.lock();
        selector::select_inline_component(&state.campaigns, &state.dismissed, screen).cloned()
    }

    pub fn inline_components(&self, screen: &str, ids: Option<&[String]>) -> Vec<Campaign> {
        let state = self.inner.state.lock();
        selector::select_inline_components(&state.campaigns, &state.dismissed, screen, ids)
            .into_iter()
            .cloned()
            .collect()
    }

    // -- Events ------------------------------------------------------------

    /// Subscribe to `kind`.
    ///
    /// A new `CampaignsUpdated` subscriber is called once, before this
    /// returns, with the current list if any campaigns are loaded.
    pub fn on(&self, kind: EventKind, callback: Callback) {
        self.inner.hub.on(kind, callback.clone());
        if kind == EventKind::CampaignsUpdated {
            let event = {
                let state = self.inner.state.lock();
                (!state.campaigns.is_empty()).then(|| state.updated_event())
            };
            if let Some(event) = event {
                callback(&event);
            }
        }
    }

    pub fn off(&self, kind: EventKind, callback: &Callback) {
        self.inner.hub.off(kind, callback);
    }

    // -- Dismissal and analytics -------------------------------------------

    /// Dismiss a campaign on this device.
    ///
    /// The campaign disappears from selector results and subscribers are
    /// re-notified before this returns; the write to local storage happens
    /// last and its failure is logged and discarded.
    pub async fn dismiss_campaign(&self, id: &str, kind: ComponentKind, reason: &str) {
        let event = {
            let mut state = self.inner.state.lock();
            state.dismissed.insert(id.to_string());
            state.updated_event()
        };

        self.track(CAMPAIGN_DISMISSED, dismissal_properties(id, kind, reason));

        self.inner.hub.emit(&event);

        let _persist = self.inner.persist.lock().await;
        let dismissals = self.inner.dismissals.clone();
        let owned_id = id.to_string();
        if let Err(e) = run_storage(move || dismissals.dismiss(&owned_id)).await {
            tracing::warn!(id, error = %e, "Failed to persist dismissal");
        }
    }

    /// Forget every dismissal, in memory and on disk, and re-notify
    /// subscribers.
    pub async fn clear_dismissals(&self) {
        let event = {
            let mut state = self.inner.state.lock();
            state.dismissed.clear();
            state.updated_event()
        };
        self.inner.hub.emit(&event);

        let _persist = self.inner.persist.lock().await;
        let dismissals = self.inner.dismissals.clone();
        if let Err(e) = run_storage(move || dismissals.clear()).await {
            tracing::warn!(error = %e, "Failed to clear persisted dismissals");
        }
    }

    pub fn track(&self, event: &str, properties: Map<String, Value>) {
        self.inner.analytics.track(event, &properties);
    }

    pub fn track_campaign_impression(&self, id: &str, kind: ComponentKind) {
        self.track(CAMPAIGN_IMPRESSION, campaign_properties(id, kind));
    }

    pub fn track_campaign_action(&self, id: &str, kind: ComponentKind, action: &str) {
        let mut props = campaign_properties(id, kind);
        props.insert("action".to_string(), json!(action));
        self.track(CAMPAIGN_ACTION, props);
    }
}

/// Run a blocking storage call off the async runtime. A task that panics or
/// is cancelled surfaces as [`StorageError::Task`].
async fn run_storage<T, F>(op: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
}
