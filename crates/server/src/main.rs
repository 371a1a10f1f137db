//! backplane entry point.
//!
//! Boots the control thread and serves the UI shell over the stdio bridge.
//! Logging goes to stderr to avoid interfering with the bridge protocol on stdout.

use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::{Context, Result};
use backplane_client::{FetchClient, FetchConfig, ImageCache, ImageCacheHandler, Redirector};
use backplane_core::{AppConfig, PlayerCache, StoreDb};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod bridge;
mod bus;
mod host;
mod menu;
mod router;
mod screenshot;
mod session;
mod windows;

use bridge::{Bridge, Services};
use session::TrustedOrigin;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(db = %config.db_path.display(), dev_mode = config.dev_mode, "starting backplane on stdio bridge");

    let store = StoreDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening store at {}", config.db_path.display()))?;
    let trusted = TrustedOrigin::new(config.dev_mode);

    let (shell_tx, shell_rx) = mpsc::unbounded_channel();
    let (host, host_task) = host::spawn(store.clone(), trusted, shell_tx);

    let max_entries = NonZeroUsize::new(config.image_cache_max_entries).context("image cache entry budget is zero")?;
    let cache = Arc::new(ImageCache::new(max_entries, config.image_cache_max_bytes));
    let upstream = FetchClient::new(FetchConfig::from(&config))?;
    let images = ImageCacheHandler::new(cache, Arc::new(upstream), Arc::new(host.clone()), config.default_image_ttl());

    let services = Services {
        store: store.clone(),
        trusted,
        screenshot_dir: config.screenshot_dir.clone(),
        redirector: Redirector::new(config.replace_http_cache),
        images: Arc::new(images),
        player_cache: Arc::new(PlayerCache::new(config.player_cache_dir.clone())),
    };

    let stdin = BufReader::new(tokio::io::stdin());
    Bridge::serve(host, services, shell_rx, stdin, tokio::io::stdout()).await?;

    host_task.await?;
    store.close().await?;
    tracing::info!("backplane stopped");

    Ok(())
}
