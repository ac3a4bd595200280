use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The only open mode remote storages accept / 唯一支持的打开模式
pub const READ_BINARY: &str = "rb";

/// Immediate children of a listed path / 目录列表结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    /// Subdirectory names (last path segment only) / 子目录名
    pub directories: BTreeSet<String>,
    /// File names in the order the service returned them / 文件名
    pub files: Vec<String>,
}

/// Generic file storage interface / 通用文件存储接口
///
/// Every name is a logical name relative to the storage's own namespace; how it
/// maps onto the backing service is the implementation's business.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Driver name / 驱动名称
    fn name(&self) -> &str;

    /// Open a file for reading. Only [`READ_BINARY`] is accepted. / 打开文件
    async fn open(&self, name: &str, mode: &str) -> StorageResult<StorageFile>;

    /// Store content under `name` and return the name actually used / 保存文件
    async fn save(&self, name: &str, content: ContentFile) -> StorageResult<String>;

    /// Delete file / 删除文件
    async fn delete(&self, name: &str) -> StorageResult<()>;

    /// Whether `name` can be fetched / 文件是否存在
    async fn exists(&self, name: &str) -> bool;

    /// List immediate subdirectories and files under `path` / 列出目录
    async fn listdir(&self, path: &str) -> StorageResult<DirectoryListing>;

    /// File size in bytes, 0 when nothing matches / 文件大小
    async fn size(&self, name: &str) -> StorageResult<u64>;

    /// Last modification time, `None` when nothing matches / 修改时间
    async fn modified_time(&self, name: &str) -> StorageResult<Option<DateTime<Utc>>>;

    /// Last access time / 访问时间
    async fn accessed_time(&self, name: &str) -> StorageResult<Option<DateTime<Utc>>> {
        self.modified_time(name).await
    }

    /// Creation time / 创建时间
    async fn created_time(&self, name: &str) -> StorageResult<Option<DateTime<Utc>>> {
        self.modified_time(name).await
    }

    /// Public URL / 公开访问URL
    fn url(&self, name: &str) -> String;

    /// Direct URL for hosts that can reach the storage directly / 直连URL
    fn path(&self, name: &str) -> String {
        self.url(name)
    }
}

pub mod error;
pub mod file;
pub mod manager;

pub use error::{RemoteError, StorageError, StorageResult};
pub use file::{ContentBody, ContentFile, ObjectBody, StorageFile};
pub use manager::{StorageBox, StorageFactory, StorageManager};
