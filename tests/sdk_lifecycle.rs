//! Polling, change detection and subscription behavior of the SDK.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use campaignkit::campaign::Campaign;
use campaignkit::client::{CampaignSource, ClientError};
use campaignkit::events::{callback, EventKind};
use campaignkit::sdk::{PollState, DEFAULT_POLL_INTERVAL};
use campaignkit::storage::MemoryKeyValueStore;
use campaignkit::CampaignSdk;
use common::{ids, inactive, inline, popup, update_recorder, FakeSource};
use tokio::sync::Notify;

fn sdk_with(source: Arc<FakeSource>) -> CampaignSdk {
    CampaignSdk::new(source, Arc::new(MemoryKeyValueStore::new()))
}

#[tokio::test]
async fn test_initialize_fetches_once_and_filters_inactive() {
    let source = FakeSource::new(vec![
        popup("welcome_popup", "Home"),
        inactive(popup("old_popup", "Home")),
    ]);
    let sdk = sdk_with(source.clone());
    assert_eq!(sdk.state(), PollState::Uninitialized);

    sdk.initialize("app-key").await;

    assert_eq!(source.fetch_count(), 1);
    assert_eq!(sdk.state(), PollState::Polling);
    assert_eq!(sdk.app_key().as_deref(), Some("app-key"));
    assert_eq!(ids(&sdk.campaigns()), vec!["welcome_popup"]);
    sdk.teardown();
}

#[tokio::test]
async fn test_initialize_twice_is_idempotent() {
    let source = FakeSource::new(vec![popup("a", "Home")]);
    let sdk = sdk_with(source.clone());

    sdk.initialize("k").await;
    sdk.initialize("k").await;
    assert_eq!(source.fetch_count(), 1);

    let other = sdk.clone();
    tokio::join!(sdk.initialize("k"), other.initialize("k"));
    assert_eq!(source.fetch_count(), 1);
    sdk.teardown();
}

#[tokio::test]
async fn test_concurrent_first_initialize_fetches_once() {
    let source = FakeSource::new(vec![popup("a", "Home")]);
    let sdk = sdk_with(source.clone());
    let other = sdk.clone();

    tokio::join!(sdk.initialize("k"), other.initialize("k"));
    assert_eq!(source.fetch_count(), 1);
    sdk.teardown();
}

#[tokio::test(start_paused = true)]
async fn test_polls_on_fixed_interval() {
    let source = FakeSource::new(vec![popup("a", "Home")]);
    let sdk = sdk_with(source.clone()).with_poll_interval(Duration::from_secs(5));

    sdk.initialize("k").await;
    assert_eq!(source.fetch_count(), 1);

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert_eq!(source.fetch_count(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(source.fetch_count(), 2);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(source.fetch_count(), 3);

    // A second initialize must not start another timer.
    sdk.initialize("k").await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(source.fetch_count(), 4);
    sdk.teardown();
}

#[tokio::test]
async fn test_identical_fetch_emits_nothing() {
    let source = FakeSource::new(vec![popup("a", "Home"), inline("b", "Home")]);
    let sdk = sdk_with(source.clone());
    let (seen, cb) = update_recorder();
    sdk.on(EventKind::CampaignsUpdated, cb);

    sdk.initialize("k").await;
    assert_eq!(seen.lock().len(), 1);

    assert!(!sdk.refresh().await);
    assert!(!sdk.refresh().await);
    assert_eq!(seen.lock().len(), 1);
    sdk.teardown();
}

#[tokio::test]
async fn test_content_change_emits_exactly_once() {
    let source = FakeSource::new(vec![popup("a", "Home")]);
    let sdk = sdk_with(source.clone());
    let (seen, cb) = update_recorder();
    sdk.on(EventKind::CampaignsUpdated, cb);
    sdk.initialize("k").await;

    let mut edited = popup("a", "Home");
    edited.trigger = campaignkit::campaign::Trigger::screen_enter("Cart");
    source.then_return(vec![edited]);

    assert!(sdk.refresh().await);
    assert!(!sdk.refresh().await);
    assert_eq!(seen.lock().len(), 2);
    assert!(sdk.popup_campaign("Home").is_none());
    assert_eq!(sdk.popup_campaign("Cart").unwrap().id, "a");
    sdk.teardown();
}

#[tokio::test]
async fn test_reorder_counts_as_change() {
    let source = FakeSource::new(vec![popup("a", "Home"), popup("b", "Home")]);
    let sdk = sdk_with(source.clone());
    let (seen, cb) = update_recorder();
    sdk.on(EventKind::CampaignsUpdated, cb);
    sdk.initialize("k").await;

    source.then_return(vec![popup("b", "Home"), popup("a", "Home")]);
    assert!(sdk.refresh().await);

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1], vec!["b", "a"]);
    assert_eq!(sdk.popup_campaign("Home").unwrap().id, "b");
    sdk.teardown();
}

#[tokio::test]
async fn test_late_subscriber_gets_current_list_immediately() {
    let source = FakeSource::new(vec![inline("first", "Home"), inline("second", "Home")]);
    let sdk = sdk_with(source.clone());
    sdk.initialize("k").await;

    let (seen, cb) = update_recorder();
    sdk.on(EventKind::CampaignsUpdated, cb);

    // Delivered before `on` returned, without another fetch.
    assert_eq!(*seen.lock(), vec![vec!["first", "second"]]);
    assert_eq!(source.fetch_count(), 1);
    sdk.teardown();
}

#[tokio::test]
async fn test_no_replay_when_nothing_loaded() {
    let source = FakeSource::new(Vec::new());
    let sdk = sdk_with(source);
    sdk.initialize("k").await;

    let (seen, cb) = update_recorder();
    sdk.on(EventKind::CampaignsUpdated, cb);
    assert!(seen.lock().is_empty());
    sdk.teardown();
}

#[tokio::test]
async fn test_off_stops_delivery() {
    let source = FakeSource::new(vec![popup("a", "Home")]);
    let sdk = sdk_with(source.clone());
    let (seen, cb) = update_recorder();
    sdk.on(EventKind::CampaignsUpdated, cb.clone());
    sdk.initialize("k").await;
    sdk.off(EventKind::CampaignsUpdated, &cb);

    source.then_return(vec![popup("b", "Home")]);
    assert!(sdk.refresh().await);
    assert_eq!(seen.lock().len(), 1);
    sdk.teardown();
}

#[tokio::test]
async fn test_fetch_failure_clears_campaigns_and_marks_unhealthy() {
    let source = FakeSource::new(vec![popup("a", "Home")]);
    let sdk = sdk_with(source.clone());
    let (seen, cb) = update_recorder();
    sdk.on(EventKind::CampaignsUpdated, cb);
    sdk.initialize("k").await;
    assert!(sdk.health().is_healthy());

    source.then_fail(503);
    assert!(sdk.refresh().await);
    assert!(sdk.campaigns().is_empty());
    assert!(sdk.popup_campaign("Home").is_none());
    assert_eq!(seen.lock().last().unwrap().len(), 0);

    let health = sdk.health();
    assert_eq!(health.consecutive_failures, 1);
    assert!(health.last_error.unwrap().contains("503"));

    // Repeated failure: still empty, nothing new to announce.
    assert!(!sdk.refresh().await);
    assert_eq!(sdk.health().consecutive_failures, 2);

    source.then_return(vec![popup("a", "Home")]);
    assert!(sdk.refresh().await);
    assert!(sdk.health().is_healthy());
    sdk.teardown();
}

#[tokio::test(start_paused = true)]
async fn test_teardown_cancels_polling_and_subscriptions() {
    let source = FakeSource::new(vec![popup("a", "Home")]);
    let sdk = sdk_with(source.clone());
    let (seen, cb) = update_recorder();
    sdk.on(EventKind::CampaignsUpdated, cb);
    sdk.initialize("k").await;
    assert_eq!(seen.lock().len(), 1);

    sdk.teardown();
    assert_eq!(sdk.state(), PollState::Uninitialized);
    assert!(sdk.campaigns().is_empty());
    assert!(sdk.app_key().is_none());

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(source.fetch_count(), 1);

    // Fresh start after teardown; the old subscriber is gone.
    sdk.initialize("k").await;
    assert_eq!(source.fetch_count(), 2);
    assert_eq!(seen.lock().len(), 1);
    sdk.teardown();
}

#[tokio::test(start_paused = true)]
async fn test_stop_then_initialize_resumes() {
    let source = FakeSource::new(vec![popup("a", "Home")]);
    let sdk = sdk_with(source.clone());
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    sdk.on(
        EventKind::CampaignsUpdated,
        callback(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }),
    );
    sdk.initialize("k").await;

    sdk.stop();
    assert_eq!(sdk.state(), PollState::Stopped);
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(sdk.campaigns().len(), 1);

    sdk.initialize("k").await;
    assert_eq!(sdk.state(), PollState::Polling);
    assert_eq!(source.fetch_count(), 2);

    tokio::time::sleep(Duration::from_millis(5_100)).await;
    assert_eq!(source.fetch_count(), 3);
    // The list never changed, so the subscriber was only told once.
    assert_eq!(count.load(Ordering::SeqCst), 1);
    sdk.teardown();
}

#[tokio::test]
async fn test_instances_are_isolated() {
    let first = sdk_with(FakeSource::new(vec![popup("a", "Home")]));
    let second = sdk_with(FakeSource::new(vec![popup("b", "Home")]));
    first.initialize("k").await;
    second.initialize("k").await;

    first
        .dismiss_campaign("a", campaignkit::ComponentKind::Popup, "close")
        .await;

    assert!(first.popup_campaign("Home").is_none());
    assert_eq!(second.popup_campaign("Home").unwrap().id, "b");
    first.teardown();
    second.teardown();
}

#[test]
fn test_builders_only_apply_before_sharing() {
    let sdk = sdk_with(FakeSource::new(Vec::new())).with_poll_interval(Duration::from_secs(30));
    assert_eq!(sdk.poll_interval(), Duration::from_secs(30));

    let shared = sdk_with(FakeSource::new(Vec::new()));
    let _other = shared.clone();
    let shared = shared.with_poll_interval(Duration::from_secs(30));
    assert_eq!(shared.poll_interval(), DEFAULT_POLL_INTERVAL);
}

/// Source whose first fetch blocks until released; later fetches answer
/// immediately with a newer list.
struct GatedSource {
    calls: AtomicUsize,
    started: Notify,
    release: Notify,
}

#[async_trait]
impl CampaignSource for GatedSource {
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, ClientError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.started.notify_one();
            self.release.notified().await;
            Ok(vec![popup("old", "Home")])
        } else {
            Ok(vec![popup("new", "Home")])
        }
    }
}

#[tokio::test]
async fn test_overlapping_refresh_keeps_newest_result() {
    let source = Arc::new(GatedSource {
        calls: AtomicUsize::new(0),
        started: Notify::new(),
        release: Notify::new(),
    });
    let sdk = CampaignSdk::new(source.clone(), Arc::new(MemoryKeyValueStore::new()));
    let (seen, cb) = update_recorder();
    sdk.on(EventKind::CampaignsUpdated, cb);

    let slow = {
        let sdk = sdk.clone();
        tokio::spawn(async move { sdk.refresh().await })
    };
    source.started.notified().await;

    assert!(sdk.refresh().await);
    assert_eq!(ids(&sdk.campaigns()), vec!["new"]);

    source.release.notify_one();
    assert!(!slow.await.unwrap());
    assert_eq!(ids(&sdk.campaigns()), vec!["new"]);
    assert_eq!(*seen.lock(), vec![vec!["new"]]);
}
