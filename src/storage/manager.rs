use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use anyhow::{anyhow, Result};

use super::{Storage, StorageResult};

pub type StorageBox = Arc<Box<dyn Storage>>;

/// Storage factory trait / 存储工厂 trait
pub trait StorageFactory: Send + Sync {
    /// Driver type name / 驱动类型名称
    fn driver_type(&self) -> &'static str;

    /// Create storage instance from a flat option mapping / 创建存储实例
    fn create_storage(&self, options: &HashMap<String, String>) -> StorageResult<Box<dyn Storage>>;
}

/// Storage manager (named storage instances + factories) / 存储管理器
#[derive(Clone)]
pub struct StorageManager {
    storages: Arc<RwLock<HashMap<String, StorageBox>>>,
    factories: Arc<RwLock<HashMap<String, Arc<Box<dyn StorageFactory>>>>>,
    /// Storage error status (name -> error message) / 存储错误状态
    storage_errors: Arc<RwLock<HashMap<String, String>>>,
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageManager {
    pub fn new() -> Self {
        Self {
            storages: Arc::new(RwLock::new(HashMap::new())),
            factories: Arc::new(RwLock::new(HashMap::new())),
            storage_errors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register storage factory / 注册存储工厂
    pub async fn register_factory(&self, factory: Box<dyn StorageFactory>) -> Result<()> {
        let driver_type = factory.driver_type().to_string();
        let mut factories = self.factories.write().await;
        factories.insert(driver_type.clone(), Arc::new(factory));

        tracing::info!("Storage factory registered: {}", driver_type);
        Ok(())
    }

    /// Create a named storage. Construction performs no network activity. / 创建存储实例
    pub async fn create_storage(
        &self,
        name: &str,
        driver_type: &str,
        options: &HashMap<String, String>,
    ) -> Result<StorageBox> {
        let factory = {
            let factories = self.factories.read().await;
            factories
                .get(driver_type)
                .cloned()
                .ok_or_else(|| anyhow!("Storage driver type not found: {}", driver_type))?
        };

        match factory.create_storage(options) {
            Ok(storage) => {
                let storage: StorageBox = Arc::new(storage);
                self.storages.write().await.insert(name.to_string(), storage.clone());
                self.storage_errors.write().await.remove(name);
                tracing::info!("Storage created: {} ({})", name, driver_type);
                Ok(storage)
            }
            Err(e) => {
                let error_msg = e.to_string();
                self.storage_errors.write().await.insert(name.to_string(), error_msg.clone());
                tracing::error!("Storage creation failed: {} ({}) - {}", name, driver_type, error_msg);
                Err(anyhow!(e).context(format!("failed to create storage {}", name)))
            }
        }
    }

    /// Verify every storage by listing its root; failures are recorded, not raised / 验证所有存储
    pub async fn verify_all(&self) -> HashMap<String, Result<(), String>> {
        let storages = self.get_all_storages().await;
        let checks = storages.into_iter().map(|(name, storage)| async move {
            let result = storage.listdir("").await.map(|_| ()).map_err(|e| e.to_string());
            (name, result)
        });
        let results: HashMap<_, _> = futures::future::join_all(checks).await.into_iter().collect();

        let mut errors = self.storage_errors.write().await;
        for (name, result) in &results {
            match result {
                Ok(()) => {
                    errors.remove(name);
                    tracing::info!("Storage verified: {}", name);
                }
                Err(e) => {
                    errors.insert(name.clone(), e.clone());
                    tracing::warn!("Storage verification failed: {} - {}", name, e);
                }
            }
        }
        results
    }

    /// Get storage error status / 获取存储错误状态
    pub async fn get_storage_error(&self, name: &str) -> Option<String> {
        self.storage_errors.read().await.get(name).cloned()
    }

    /// Get storage instance / 获取存储实例
    pub async fn get_storage(&self, name: &str) -> Option<StorageBox> {
        self.storages.read().await.get(name).cloned()
    }

    /// Remove storage instance / 移除存储实例
    pub async fn remove_storage(&self, name: &str) -> Result<()> {
        self.storages
            .write()
            .await
            .remove(name)
            .ok_or_else(|| anyhow!("Storage not found: {}", name))?;

        tracing::info!("Storage removed: {}", name);
        Ok(())
    }

    /// List storage names (sorted) / 列出所有存储
    pub async fn list_storages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.storages.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all available driver types / 列出所有可用的驱动类型
    pub async fn list_driver_types(&self) -> Vec<String> {
        self.factories.read().await.keys().cloned().collect()
    }

    /// Get all storage instances / 获取所有存储实例
    pub async fn get_all_storages(&self) -> Vec<(String, StorageBox)> {
        let storages = self.storages.read().await;
        storages.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}
