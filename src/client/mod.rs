//! HTTP client for the remote campaign store.
//!
//! The SDK reads through [`CampaignSource`]; the admin CLI uses the CRUD
//! calls on [`CampaignClient`] directly.

mod error;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::campaign::{active_only, decode_entries, Campaign};

pub use error::ClientError;

/// Where the SDK gets its campaign list from.
#[async_trait]
pub trait CampaignSource: Send + Sync {
    /// One best-effort read of the full (unfiltered) campaign list.
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, ClientError>;
}

/// List body with entries left undecoded, so each one is checked on its own.
#[derive(Debug, Deserialize)]
struct RawCampaignList {
    campaigns: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    campaign: Campaign,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Clone)]
pub struct CampaignClient {
    client: Client,
    endpoint: Url,
}

impl CampaignClient {
    /// Create a client for the list endpoint, e.g. `http://host/campaigns`.
    ///
    /// No request timeout is configured: each fetch is a single attempt
    /// that lasts as long as the transport allows.
    pub fn new(endpoint: &str) -> Result<Self, ClientError> {
        let endpoint = Url::parse(endpoint).map_err(|e| ClientError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(ClientError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "endpoint cannot carry path segments".to_string(),
            });
        }
        let client = Client::builder().build().map_err(ClientError::Build)?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch and keep only active campaigns.
    ///
    /// Any transport, status or decode failure yields an empty list, so
    /// "network down" and "no campaigns" look the same to the caller.
    pub async fn fetch_active_campaigns(&self) -> Vec<Campaign> {
        match self.try_fetch_campaigns().await {
            Ok(campaigns) => active_only(campaigns),
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Campaign fetch failed");
                Vec::new()
            }
        }
    }

    /// Fetch the full list, reporting failures.
    ///
    /// Only a failed request or an unreadable body is an error; individual
    /// entries that are not valid campaigns are skipped with a warning.
    pub async fn try_fetch_campaigns(&self) -> Result<Vec<Campaign>, ClientError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(ClientError::Transport)?;
        let list: RawCampaignList = decode(response, None).await?;
        Ok(decode_entries(list.campaigns))
    }

    pub async fn get_campaign(&self, id: &str) -> Result<Campaign, ClientError> {
        let response = self
            .client
            .get(self.item_url(id))
            .send()
            .await
            .map_err(ClientError::Transport)?;
        decode(response, Some(id)).await
    }

    pub async fn create_campaign(&self, campaign: &Campaign) -> Result<Campaign, ClientError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(campaign)
            .send()
            .await
            .map_err(ClientError::Transport)?;
        decode(response, None).await
    }

    /// Merge `patch` (a partial campaign document) into the stored record.
    pub async fn update_campaign(&self, id: &str, patch: &Value) -> Result<Campaign, ClientError> {
        let response = self
            .client
            .put(self.item_url(id))
            .json(patch)
            .send()
            .await
            .map_err(ClientError::Transport)?;
        decode(response, Some(id)).await
    }

    /// Delete a campaign, returning the removed record.
    pub async fn delete_campaign(&self, id: &str) -> Result<Campaign, ClientError> {
        let response = self
            .client
            .delete(self.item_url(id))
            .send()
            .await
            .map_err(ClientError::Transport)?;
        let body: DeleteResponse = decode(response, Some(id)).await?;
        Ok(body.campaign)
    }

    fn item_url(&self, id: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id);
        }
        url
    }
}

#[async_trait]
impl CampaignSource for CampaignClient {
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, ClientError> {
        self.try_fetch_campaigns().await
    }
}

async fn decode<T: DeserializeOwned>(response: Response, id: Option<&str>) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(ClientError::Decode);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error.message,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };

    match status {
        StatusCode::NOT_FOUND => Err(ClientError::NotFound {
            id: id.unwrap_or_default().to_string(),
        }),
        StatusCode::BAD_REQUEST => Err(ClientError::Rejected { message }),
        _ => Err(ClientError::Status {
            status: status.as_u16(),
            message,
        }),
    }
}
