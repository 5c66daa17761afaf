use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use feedcast::config::Config;
use feedcast::feed::FeedFetcher;
use feedcast::filter::{MemoryProbeCache, ProbeClient};
use feedcast::media::{YtDlp, YtDlpTool};
use feedcast::podcast::PodcastService;
use feedcast::server::{build_router, serve, AppState};
use feedcast::storage::Database;

#[derive(Parser, Debug)]
#[command(
    name = "feedcast",
    about = "Filtering feed proxy that republishes video channels as podcasts"
)]
struct Args {
    /// TOML config file (missing file means defaults)
    #[arg(long, value_name = "FILE", default_value = "feedcast.toml")]
    config: PathBuf,

    /// Socket address to listen on, overrides config and environment
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,

    /// Public base URL for media links, overrides config and environment
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config '{}'", args.config.display()))?;
    config
        .apply_env()
        .context("Invalid environment configuration")?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }

    std::fs::create_dir_all(&config.media_dir).with_context(|| {
        format!(
            "Failed to create media directory '{}'",
            config.media_dir.display()
        )
    })?;
    ensure_parent_dir(&config.database_path)?;

    let db = Database::open(&config.database_path.to_string_lossy())
        .await
        .with_context(|| {
            format!(
                "Failed to open catalog '{}'",
                config.database_path.display()
            )
        })?;

    let client = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;
    let fetcher = FeedFetcher::new(client, config.fetch_timeout());
    let probes = ProbeClient::new(
        config.probe_base_url.clone(),
        config.probe_timeout(),
        Arc::new(MemoryProbeCache::new()),
    )
    .context("Failed to build probe client")?;
    let media = YtDlp::new(YtDlpTool::new(&config.yt_dlp_path), &config.media_dir);
    let podcasts = PodcastService::new(db.clone(), Arc::new(media), config.base_url.clone());

    let state = AppState {
        fetcher: Arc::new(fetcher),
        probes: Arc::new(probes),
        podcasts: Arc::new(podcasts),
    };
    let router = build_router(state, &config.media_dir);

    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    tracing::info!(
        listen = %config.listen,
        base_url = %config.base_url,
        media_dir = %config.media_dir.display(),
        "Server listening"
    );

    serve(listener, router).await.context("Server error")?;

    db.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
