use anyhow::Context;
use get_x::client::DEFAULT_BASE_URL;
use get_x::server::GetXServer;
use get_x::{MemoryCache, Settings, TimelineService, XClient};
use rmcp::{ServiceExt, transport::stdio};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn load_config() -> anyhow::Result<Settings> {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/root".into());
    let path = PathBuf::from(home)
        .join(".config")
        .join("mcp-server-get-x")
        .join("config.toml");

    let content = std::fs::read_to_string(&path).with_context(|| {
        format!(
            "Failed to read config file: {}\n\
             Create it with your X app credentials.\n\
             Example:\n\n\
             consumer_key = \"your-consumer-key\"\n\
             consumer_secret = \"your-consumer-secret\"\n\
             # optional defaults for every call\n\
             screen_name = \"netglooweb\"\n\
             count = 20\n\
             cache_expiration_seconds = 60\n\n\
             Get credentials at https://developer.x.com/",
            path.display()
        )
    })?;

    let settings: Settings = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config at {}: {e}", path.display()))?;

    tracing::info!("Config loaded and validated from {}", path.display());
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let settings = load_config()?;
    let base_url = settings.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
    let client = XClient::with_options(base_url, settings.timeout())
        .context("Failed to build HTTP client")?;
    let service = TimelineService::new(client, Arc::new(MemoryCache::new()));

    let server = GetXServer::new(service, settings.defaults);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
