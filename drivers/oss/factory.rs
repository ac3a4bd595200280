//! OSS驱动工厂

use std::collections::HashMap;

use crate::storage::{Storage, StorageFactory, StorageResult};
use super::config::OssConfig;
use super::driver::OssStorage;

/// OSS驱动工厂
pub struct OssStorageFactory;

impl StorageFactory for OssStorageFactory {
    fn driver_type(&self) -> &'static str {
        "oss"
    }

    fn create_storage(&self, options: &HashMap<String, String>) -> StorageResult<Box<dyn Storage>> {
        let config = OssConfig::from_options(options)?;
        tracing::debug!("OSS storage configured: {:?}", config);
        Ok(Box::new(OssStorage::new(config)))
    }
}
