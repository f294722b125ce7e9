use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::CampaignStore;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub campaigns: usize,
}

pub(super) async fn health(State(store): State<CampaignStore>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        service: "campaignkit".to_string(),
        campaigns: store.len(),
    })
}
