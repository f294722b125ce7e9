//! Analytics collaborator for impressions, actions and dismissals.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Map, Value};

use crate::campaign::ComponentKind;

pub const CAMPAIGN_IMPRESSION: &str = "campaign_impression";
pub const CAMPAIGN_ACTION: &str = "campaign_action";
pub const CAMPAIGN_DISMISSED: &str = "campaign_dismissed";

/// Receives tracked events. Implementations must not block.
pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: &str, properties: &Map<String, Value>);
}

/// Default sink: one structured log line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn track(&self, event: &str, properties: &Map<String, Value>) {
        // Bound outside the macro: `tracing` brings its own `Value` into scope.
        let payload = Value::Object(properties.clone());
        tracing::info!(
            target: "campaignkit::analytics",
            event,
            properties = %payload,
            "Tracked event"
        );
    }
}

/// Milliseconds since the Unix epoch.
pub fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Base properties for any campaign event: `id`, `kind`, `timestamp`.
pub fn campaign_properties(id: &str, kind: ComponentKind) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert("id".to_string(), json!(id));
    props.insert("kind".to_string(), json!(kind.as_str()));
    props.insert("timestamp".to_string(), json!(timestamp_millis()));
    props
}

/// Properties of a `campaign_dismissed` event.
pub fn dismissal_properties(id: &str, kind: ComponentKind, reason: &str) -> Map<String, Value> {
    let mut props = campaign_properties(id, kind);
    props.insert("reason".to_string(), json!(reason));
    props
}
