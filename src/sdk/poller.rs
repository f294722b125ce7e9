use std::sync::Weak;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::{CampaignSdk, SdkInner};

/// Recurring fetch. The first tick is one period out because `initialize`
/// already fetched once.
///
/// Holds only a weak reference so dropping the last SDK handle ends the loop.
pub(super) async fn poll_loop(inner: Weak<SdkInner>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            tracing::debug!("SDK dropped, polling loop exiting");
            break;
        };
        CampaignSdk { inner }.refresh().await;
    }
}
