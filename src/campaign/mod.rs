//! Campaign documents as served by the campaign store.

mod types;

use serde_json::Value;

pub use types::{
    Campaign, CampaignAction, CampaignContent, CampaignList, ComponentKind,
    InlineComponentProps, PermissionPromptProps, PopupProps, Trigger,
};

/// Decode list entries one at a time, skipping any that are not valid
/// campaigns. A malformed entry never hides its neighbours.
pub fn decode_entries(entries: Vec<Value>) -> Vec<Campaign> {
    let total = entries.len();
    let campaigns: Vec<Campaign> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let id = entry
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("<missing>")
                .to_string();
            match serde_json::from_value::<Campaign>(entry) {
                Ok(campaign) => Some(campaign),
                Err(e) => {
                    tracing::warn!(index, id = %id, error = %e, "Skipping malformed campaign");
                    None
                }
            }
        })
        .collect();
    if campaigns.len() < total {
        tracing::debug!(kept = campaigns.len(), total, "Campaign list partially decoded");
    }
    campaigns
}

/// Keep only campaigns whose `active` flag is set, preserving order.
pub fn active_only(campaigns: Vec<Campaign>) -> Vec<Campaign> {
    campaigns.into_iter().filter(|c| c.active).collect()
}
