use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;

use campaignkit::analytics::{dismissal_properties, AnalyticsSink, TracingSink, CAMPAIGN_DISMISSED};
use campaignkit::campaign::{active_only, Campaign};
use campaignkit::cli::{Cli, Command};
use campaignkit::client::CampaignClient;
use campaignkit::config::Config;
use campaignkit::events::{callback, EventKind, SdkEvent};
use campaignkit::storage::{open_store, DismissalStore};
use campaignkit::store::{CampaignStore, StoreServer};
use campaignkit::CampaignSdk;

#[tokio::main]
async fn main() -> Result<()> {
    campaignkit::init_tracing();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    cli.apply_overrides(&mut config);
    config.validate()?;

    match cli.command {
        Command::Serve { .. } => serve(&config).await,
        Command::Watch { key, screens, .. } => watch(&config, &key, screens).await,
        Command::List { all } => {
            let client = CampaignClient::new(&config.client.endpoint)?;
            let campaigns = client.try_fetch_campaigns().await?;
            let campaigns = if all { campaigns } else { active_only(campaigns) };
            print_json(&campaigns)
        }
        Command::Get { id } => {
            let client = CampaignClient::new(&config.client.endpoint)?;
            print_json(&client.get_campaign(&id).await?)
        }
        Command::Create { file } => {
            let campaign: Campaign = serde_json::from_str(&read_input(&file)?)
                .context("Input is not a valid campaign document")?;
            let client = CampaignClient::new(&config.client.endpoint)?;
            print_json(&client.create_campaign(&campaign).await?)
        }
        Command::Update { id, patch } => {
            let patch: serde_json::Value =
                serde_json::from_str(&patch).context("Patch is not valid JSON")?;
            if !patch.is_object() {
                bail!("Patch must be a JSON object");
            }
            let client = CampaignClient::new(&config.client.endpoint)?;
            print_json(&client.update_campaign(&id, &patch).await?)
        }
        Command::Delete { id } => {
            let client = CampaignClient::new(&config.client.endpoint)?;
            print_json(&client.delete_campaign(&id).await?)
        }
        Command::Dismiss { id, kind, reason } => {
            let dismissals = DismissalStore::new(open_store(&config.storage));
            dismissals.dismiss(&id)?;
            TracingSink.track(CAMPAIGN_DISMISSED, &dismissal_properties(&id, kind, &reason));
            Ok(())
        }
        Command::ClearDismissals => {
            DismissalStore::new(open_store(&config.storage)).clear()?;
            tracing::info!("Local dismissals cleared");
            Ok(())
        }
    }
}

async fn serve(config: &Config) -> Result<()> {
    let store = CampaignStore::open(&config.store.data_file)?;
    let mut server = StoreServer::new(store);
    server
        .bind(&config.store.bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.signal();
        }
    });

    server.run().await.map_err(|e| anyhow::anyhow!("{}", e))
}

async fn watch(config: &Config, key: &str, screens: Vec<String>) -> Result<()> {
    let sdk = CampaignSdk::from_config(config)?;

    let observer = sdk.clone();
    let on_update = callback(move |event| {
        let SdkEvent::CampaignsUpdated { campaigns } = event;
        tracing::info!(count = campaigns.len(), "Campaigns updated");
        for screen in &screens {
            let popup = observer.popup_campaign(screen).map(|c| c.id);
            let prompt = observer.permission_prompt_campaign(screen).map(|c| c.id);
            let inline: Vec<String> = observer
                .inline_components(screen, None)
                .into_iter()
                .map(|c| c.id)
                .collect();
            tracing::info!(
                screen = %screen,
                popup = ?popup,
                permission_prompt = ?prompt,
                inline = ?inline,
                "Screen would render"
            );
        }
    });
    sdk.on(EventKind::CampaignsUpdated, on_update.clone());
    sdk.initialize(key).await;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    let health = sdk.health();
    tracing::info!(
        fetches = health.total_fetches,
        consecutive_failures = health.consecutive_failures,
        "Stopping watch"
    );
    sdk.off(EventKind::CampaignsUpdated, &on_update);
    sdk.teardown();
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
