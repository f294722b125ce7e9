//! Remote campaign delivery.
//!
//! [`sdk::CampaignSdk`] polls a campaign store, decides which popups,
//! permission prompts and inline components a screen should show, and
//! notifies subscribers when that changes. [`store`] is the file-backed
//! HTTP store it polls.

pub mod analytics;
pub mod campaign;
pub mod cli;
pub mod client;
pub mod config;
pub mod events;
pub mod sdk;
pub mod selector;
pub mod shutdown;
pub mod storage;
pub mod store;

use tracing_subscriber::EnvFilter;

pub use campaign::{Campaign, ComponentKind};
pub use sdk::CampaignSdk;

/// Install the global `tracing` subscriber. Honors `RUST_LOG`, default `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}
