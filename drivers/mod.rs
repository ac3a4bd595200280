// Driver package / 驱动包
pub mod oss;

use crate::storage::StorageManager;

/// Register all drivers to StorageManager / 注册所有驱动
pub async fn register_all(manager: &StorageManager) -> anyhow::Result<()> {
    // Register Aliyun OSS driver / 注册阿里云OSS驱动
    manager.register_factory(Box::new(oss::OssStorageFactory)).await?;
    Ok(())
}
