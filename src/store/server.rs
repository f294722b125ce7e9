use std::future::IntoFuture;
use std::net::SocketAddr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::campaign::{Campaign, CampaignList};
use crate::shutdown::ShutdownSignal;

use super::health::health;
use super::{CampaignStore, StoreError};

/// Routes for the campaign store, rooted at `/campaigns`.
pub fn build_router(store: CampaignStore) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/campaigns", get(list_campaigns).post(create_campaign))
        .route(
            "/campaigns/{id}",
            get(get_campaign).put(update_campaign).delete(delete_campaign),
        )
        .with_state(store)
}

/// Run a store operation that may touch the data file off the async runtime.
async fn blocking<T, F>(store: CampaignStore, op: F) -> Result<T, StoreError>
where
    F: FnOnce(&CampaignStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
}

async fn list_campaigns(State(store): State<CampaignStore>) -> Json<CampaignList> {
    Json(CampaignList {
        campaigns: store.list(),
    })
}

async fn get_campaign(
    State(store): State<CampaignStore>,
    Path(id): Path<String>,
) -> Result<Json<Campaign>, StoreError> {
    store.get(&id).map(Json)
}

async fn create_campaign(
    State(store): State<CampaignStore>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, StoreError> {
    let campaign: Campaign =
        serde_json::from_value(body).map_err(|e| StoreError::InvalidCampaign(e.to_string()))?;
    let created = blocking(store, move |s| s.create(campaign)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_campaign(
    State(store): State<CampaignStore>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Campaign>, StoreError> {
    blocking(store, move |s| s.update(&id, patch)).await.map(Json)
}

async fn delete_campaign(
    State(store): State<CampaignStore>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StoreError> {
    let removed = blocking(store, move |s| s.delete(&id)).await?;
    Ok(Json(json!({
        "message": format!("Campaign '{}' deleted", removed.id),
        "campaign": removed,
    })))
}

pub struct StoreServer {
    pub addr: SocketAddr,
    /// Populated by bind(), consumed by run().
    listener: Option<TcpListener>,
    store: CampaignStore,
    shutdown: ShutdownSignal,
}

impl StoreServer {
    pub fn new(store: CampaignStore) -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 0)), // Will be determined at bind time
            listener: None,
            store,
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Bind to `bind_addr` and return the actual address (useful with port 0).
    pub async fn bind(&mut self, bind_addr: &str) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        let addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| format!("Invalid bind address '{}': {}", bind_addr, e))?;
        let listener = TcpListener::bind(addr).await?;
        let actual_addr = listener.local_addr()?;
        self.addr = actual_addr;
        self.listener = Some(listener);
        tracing::info!("Campaign store bound to {}", actual_addr);
        Ok(actual_addr)
    }

    pub fn store(&self) -> CampaignStore {
        self.store.clone()
    }

    /// Handle that stops `run` gracefully when signalled.
    pub fn shutdown_handle(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Serve until the shutdown handle is signalled.
    ///
    /// Consumes self to take ownership of the pre-bound listener.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = self
            .listener
            .ok_or("bind() must be called before run()")?;

        tracing::info!("Starting campaign store on {}", self.addr);

        let app = build_router(self.store.clone());
        let shutdown = self.shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.wait().await;
            })
            .into_future()
            .await?;

        tracing::info!("Campaign store shut down");
        Ok(())
    }
}
