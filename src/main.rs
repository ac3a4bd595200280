use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oss_storage::config;
use oss_storage::storage::StorageManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oss_storage=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("oss-storage {} (built {})", env!("CARGO_PKG_VERSION"), env!("BUILD_TIME"));

    // Load configuration / 加载配置
    config::init_config().map_err(anyhow::Error::msg)?;
    let app_config = config::config();
    tracing::info!("OSS settings: {:?}", app_config.oss);

    // Register storage drivers / 注册存储驱动
    let manager = StorageManager::new();
    oss_storage::register_storage_drivers(&manager).await?;

    // Create every configured storage / 创建所有存储
    let mut failed = Vec::new();
    for mount in &app_config.storages {
        let options = app_config.storage_options(mount);
        if let Err(e) = manager.create_storage(&mount.name, &mount.driver, &options).await {
            tracing::error!("{:#}", e);
            failed.push(mount.name.clone());
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("Storage configuration invalid: {}", failed.join(", "));
    }

    // Verify storages: try list root directory / 验证存储
    let results = manager.verify_all().await;
    for name in manager.list_storages().await {
        let Some(storage) = manager.get_storage(&name).await else {
            continue;
        };
        let status = match results.get(&name) {
            Some(Ok(())) => "ok".to_string(),
            Some(Err(e)) => format!("unreachable: {}", e),
            None => "unknown".to_string(),
        };
        tracing::info!(
            "Storage {}: url={}, path={}, status={}",
            name,
            storage.url(""),
            storage.path(""),
            status
        );
    }

    Ok(())
}
