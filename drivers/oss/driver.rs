//! OSS驱动核心实现
//!
//! - 每个驱动实例持有一个惰性创建的客户端，首次使用时创建，之后复用
//! - 所有对象键都经过 `OssConfig::object_key`，前缀隔离同一存储桶内的多个存储
//! - 不做重试，远程错误原样返回（`exists` 除外）

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;

use crate::storage::{
    ContentFile, DirectoryListing, Storage, StorageError, StorageFile, StorageResult, READ_BINARY,
};
use super::client::{ClientConnector, ListObjectsRequest, ObjectClient, ObjectSummary, PutObjectRequest, S3Connector};
use super::config::OssConfig;

/// 列目录每页数量
const LIST_PAGE_SIZE: usize = 1000;
const DELIMITER: &str = "/";

/// OSS存储驱动
pub struct OssStorage {
    config: OssConfig,
    connector: Arc<dyn ClientConnector>,
    client: OnceCell<Arc<dyn ObjectClient>>,
}

impl OssStorage {
    /// 使用 rust-s3 客户端创建驱动（不会发起网络请求）
    pub fn new(config: OssConfig) -> Self {
        Self::with_connector(config, Arc::new(S3Connector))
    }

    pub fn with_connector(config: OssConfig, connector: Arc<dyn ClientConnector>) -> Self {
        Self {
            config,
            connector,
            client: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &OssConfig {
        &self.config
    }

    /// 获取客户端，首次调用时创建；并发首次调用只创建一次，创建失败下次重试
    async fn client(&self) -> StorageResult<Arc<dyn ObjectClient>> {
        let client = self
            .client
            .get_or_try_init(|| async { self.connector.connect(&self.config) })
            .await?;
        Ok(client.clone())
    }

    /// 按前缀列出第一个对象，供 `size` 和 `modified_time` 使用
    ///
    /// 注意是前缀匹配而非精确匹配：`a.txt` 不存在时会匹配到 `a.txt.bak`
    async fn first_match(&self, name: &str) -> StorageResult<Option<ObjectSummary>> {
        let key = self.config.object_key(name);
        let request = ListObjectsRequest {
            prefix: key,
            delimiter: None,
            max_keys: 1,
            continuation_token: None,
        };
        let page = self.client().await?.list_objects_v2(&request).await?;
        Ok(page.contents.into_iter().next())
    }
}

/// 公共前缀 -> 最后一级目录名
fn last_segment(prefix: &str) -> &str {
    let trimmed = prefix.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// 逐段URL编码，保留 `/` 分隔符
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn https_url(host: &str, key: &str) -> String {
    format!(
        "https://{}/{}",
        host.trim_end_matches('/'),
        encode_key(key.trim_start_matches('/'))
    )
}

#[async_trait]
impl Storage for OssStorage {
    fn name(&self) -> &str {
        "OSS"
    }

    async fn open(&self, name: &str, mode: &str) -> StorageResult<StorageFile> {
        if mode != READ_BINARY {
            return Err(StorageError::UnsupportedMode(mode.to_string()));
        }

        let key = self.config.object_key(name);
        tracing::debug!("OSS GetObject: key={}", key);
        let body = self.client().await?.get_object(&key).await?;
        Ok(StorageFile::new(name, body))
    }

    async fn save(&self, name: &str, content: ContentFile) -> StorageResult<String> {
        let key = self.config.object_key(name);
        let (body, content_type) = content.into_parts().await?;

        tracing::debug!(
            "OSS PutObject: key={}, size={}, content_type={:?}",
            key,
            body.len(),
            content_type
        );

        self.client()
            .await?
            .put_object(PutObjectRequest { key, body, content_type })
            .await?;
        Ok(name.to_string())
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        let key = self.config.object_key(name);
        tracing::debug!("OSS DeleteObject: key={}", key);
        self.client().await?.delete_object(&key).await?;
        Ok(())
    }

    /// 任何失败都视为不存在（对象缺失、鉴权失败、网络错误、客户端创建失败不做区分）
    /// 只检查响应状态，响应体不读取直接释放
    async fn exists(&self, name: &str) -> bool {
        let key = self.config.object_key(name);
        let result = match self.client().await {
            Ok(client) => client.get_object(&key).await.map(|_| ()).map_err(StorageError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => true,
            Err(StorageError::Remote(e)) if e.is_not_found() => false,
            Err(e) => {
                tracing::warn!("OSS exists check failed, treating as missing: key={}, error={}", key, e);
                false
            }
        }
    }

    async fn listdir(&self, path: &str) -> StorageResult<DirectoryListing> {
        let mut prefix = self.config.object_key(path);
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }

        let client = self.client().await?;
        let mut request = ListObjectsRequest {
            prefix: prefix.clone(),
            delimiter: Some(DELIMITER.to_string()),
            max_keys: LIST_PAGE_SIZE,
            continuation_token: None,
        };

        let mut directories = BTreeSet::new();
        let mut files = Vec::new();
        let mut pages = 0usize;

        loop {
            let page = client.list_objects_v2(&request).await?;
            pages += 1;

            // 处理目录（公共前缀）
            for common_prefix in &page.common_prefixes {
                let name = last_segment(common_prefix);
                if !name.is_empty() {
                    directories.insert(name.to_string());
                }
            }

            // 处理文件，只保留直接子文件
            for obj in page.contents {
                let name = obj.key.strip_prefix(prefix.as_str()).unwrap_or(&obj.key);
                if !name.is_empty() && !name.contains('/') {
                    files.push(name.to_string());
                }
            }

            if !page.is_truncated {
                break;
            }
            match page.next_continuation_token {
                Some(token) => request.continuation_token = Some(token),
                None => {
                    tracing::warn!("OSS ListObjectsV2 truncated without continuation token: prefix={}", prefix);
                    break;
                }
            }
        }

        tracing::debug!(
            "OSS listdir: prefix={}, pages={}, directories={}, files={}",
            prefix,
            pages,
            directories.len(),
            files.len()
        );
        Ok(DirectoryListing { directories, files })
    }

    async fn size(&self, name: &str) -> StorageResult<u64> {
        Ok(self.first_match(name).await?.map_or(0, |obj| obj.size))
    }

    async fn modified_time(&self, name: &str) -> StorageResult<Option<DateTime<Utc>>> {
        Ok(self.first_match(name).await?.and_then(|obj| obj.last_modified))
    }

    fn url(&self, name: &str) -> String {
        https_url(&self.config.public_url_domain, &self.config.object_key(name))
    }

    fn path(&self, name: &str) -> String {
        match self.config.endpoint_host() {
            Some(host) => https_url(host, &self.config.object_key(name)),
            None => self.url(name),
        }
    }
}
