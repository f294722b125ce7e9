//! Shared test utilities: campaign fixtures, a real store server, and fake
//! SDK collaborators.

#![allow(dead_code, unused_imports)]

pub mod mock_store;

use async_trait::async_trait;
use campaignkit::analytics::AnalyticsSink;
use campaignkit::campaign::{
    Campaign, CampaignContent, InlineComponentProps, PermissionPromptProps, PopupProps, Trigger,
};
use campaignkit::client::{CampaignSource, ClientError};
use campaignkit::events::{callback, Callback, SdkEvent};
use campaignkit::shutdown::ShutdownSignal;
use campaignkit::storage::{KeyValueStore, StorageError};
use campaignkit::store::{CampaignStore, StoreServer};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Find an available port for testing.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to free port");
    listener.local_addr().unwrap().port()
}

// -- Fixtures -----------------------------------------------------------------

pub fn popup(id: &str, screen: &str) -> Campaign {
    Campaign {
        id: id.to_string(),
        trigger: Trigger::screen_enter(screen),
        content: CampaignContent::Popup(PopupProps {
            title: format!("{} title", id),
            ..Default::default()
        }),
        active: true,
    }
}

pub fn permission_prompt(id: &str, screen: &str) -> Campaign {
    Campaign {
        id: id.to_string(),
        trigger: Trigger::screen_enter(screen),
        content: CampaignContent::PermissionPrompt(PermissionPromptProps {
            permission: "notifications".to_string(),
            ..Default::default()
        }),
        active: true,
    }
}

pub fn inline(id: &str, screen: &str) -> Campaign {
    Campaign {
        id: id.to_string(),
        trigger: Trigger::screen_enter(screen),
        content: CampaignContent::InlineComponent(InlineComponentProps {
            title: format!("{} banner", id),
            ..Default::default()
        }),
        active: true,
    }
}

pub fn inactive(mut campaign: Campaign) -> Campaign {
    campaign.active = false;
    campaign
}

pub fn ids(campaigns: &[Campaign]) -> Vec<String> {
    campaigns.iter().map(|c| c.id.clone()).collect()
}

// -- Real store server --------------------------------------------------------

pub struct RunningStore {
    pub addr: SocketAddr,
    pub store: CampaignStore,
    shutdown: ShutdownSignal,
    _dir: TempDir,
}

impl RunningStore {
    pub fn endpoint(&self) -> String {
        format!("http://{}/campaigns", self.addr)
    }
}

impl Drop for RunningStore {
    fn drop(&mut self) {
        self.shutdown.signal();
    }
}

/// Start a campaign store on an ephemeral port, seeded with `campaigns`.
pub async fn start_store(campaigns: Vec<Campaign>) -> RunningStore {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = CampaignStore::open(dir.path().join("campaigns.json")).unwrap();
    for campaign in campaigns {
        store.create(campaign).unwrap();
    }

    let mut server = StoreServer::new(store.clone());
    let addr = server.bind("127.0.0.1:0").await.unwrap();
    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        let _ = server.run().await;
    });

    RunningStore {
        addr,
        store,
        shutdown,
        _dir: dir,
    }
}

// -- Fake collaborators -------------------------------------------------------

/// Campaign source returning scripted results. When the script runs out the
/// last result repeats.
pub struct FakeSource {
    script: Mutex<VecDeque<Result<Vec<Campaign>, u16>>>,
    last: Mutex<Result<Vec<Campaign>, u16>>,
    fetches: AtomicUsize,
}

impl FakeSource {
    pub fn new(campaigns: Vec<Campaign>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(Ok(campaigns)),
            fetches: AtomicUsize::new(0),
        })
    }

    /// Queue a successful fetch.
    pub fn then_return(&self, campaigns: Vec<Campaign>) {
        self.script.lock().push_back(Ok(campaigns));
    }

    /// Queue a failed fetch with the given HTTP status.
    pub fn then_fail(&self, status: u16) {
        self.script.lock().push_back(Err(status));
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CampaignSource for FakeSource {
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, ClientError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        let result = match next {
            Some(result) => {
                *self.last.lock() = result.clone();
                result
            }
            None => self.last.lock().clone(),
        };
        result.map_err(|status| ClientError::Status {
            status,
            message: "scripted failure".to_string(),
        })
    }
}

/// Analytics sink that remembers every tracked event.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<(String, Map<String, Value>)> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events.lock().iter().map(|(n, _)| n.clone()).collect()
    }
}

impl AnalyticsSink for RecordingSink {
    fn track(&self, event: &str, properties: &Map<String, Value>) {
        self.events
            .lock()
            .push((event.to_string(), properties.clone()));
    }
}

/// Key-value store whose every operation fails.
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Task("storage offline".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Task("storage offline".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Task("storage offline".to_string()))
    }
}

/// Callback that records the campaign ids of every update it receives.
pub fn update_recorder() -> (Arc<Mutex<Vec<Vec<String>>>>, Callback) {
    let seen: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let cb = callback(move |event| {
        let SdkEvent::CampaignsUpdated { campaigns } = event;
        sink.lock().push(ids(campaigns));
    });
    (seen, cb)
}
