use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::StaticConfig;
use crate::services::LinkResolver;
use crate::storage::StorageFactory;

pub struct StartupContext {
    pub resolver: Arc<LinkResolver>,
    pub backend_name: &'static str,
}

/// 准备服务器启动的上下文：校验配置、连接存储、构建 resolver
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    config.validate().context("Invalid configuration")?;

    let store = StorageFactory::create(&config.store)
        .await
        .context("Failed to create storage backend")?;
    let backend_name = store.backend_name();
    info!("Using storage backend: {}", backend_name);

    let resolver = LinkResolver::from_config(store, config)
        .context("Failed to build link resolver")?;

    info!(
        "Histogram window: {} days, precision {}, exhaustion policy {}",
        config.histogram.window_days, config.histogram.precision, config.histogram.exhaustion
    );
    debug!("Pre-startup finished in {:?}", start_time.elapsed());

    Ok(StartupContext {
        resolver: Arc::new(resolver),
        backend_name,
    })
}
