use flexi_logger::Logger;
use log::info;

use geoproc_operators::cache::{CacheConfig, CacheManager};
use geoproc_operators::default_registry;

use geoproc_services::error::Result;
use geoproc_services::server::CacheServer;
use geoproc_services::util::config::{self, get_config_element};

#[tokio::main]
async fn main() -> Result<()> {
    let logging = get_config_element::<config::Logging>()?;
    // the handle must stay alive for the duration of the process
    let _logger = Logger::try_with_str(&logging.level)?.start()?;

    let server_config = get_config_element::<config::Server>()?;
    let cache_config = get_config_element::<CacheConfig>()?;

    if cache_config.enabled {
        info!(
            "Cache enabled: {} bytes raster budget, {:?} eviction",
            cache_config.raster_size, cache_config.policy
        );
    } else {
        info!("Cache disabled, every query runs its producers");
    }

    let server = CacheServer::new(
        server_config,
        default_registry(),
        CacheManager::from_config(&cache_config),
    );
    let handle = server.start().await?;

    wait_for_termination().await?;
    handle.stop().await
}

#[cfg(unix)]
async fn wait_for_termination() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = sigterm.recv() => {}
    }
    info!("Received termination signal");
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_termination() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received termination signal");
    Ok(())
}
