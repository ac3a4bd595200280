//! OSS客户端
//!
//! `ObjectClient` 是驱动访问远程对象存储的唯一接口，默认实现基于 rust-s3
//! （阿里云OSS兼容S3协议）。重试、超时等策略由客户端自身负责，驱动不做处理。

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::Region;
use tokio_util::io::StreamReader;

use crate::storage::{ObjectBody, RemoteError};
use super::config::OssConfig;

/// PutObject请求
#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub key: String,
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// ListObjectsV2请求（单页）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsRequest {
    pub prefix: String,
    pub delimiter: Option<String>,
    pub max_keys: usize,
    pub continuation_token: Option<String>,
}

/// 对象摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// ListObjectsV2结果（单页）
#[derive(Debug, Clone, Default)]
pub struct ListObjectsPage {
    pub contents: Vec<ObjectSummary>,
    /// 公共前缀（伪目录），保留服务端返回的完整前缀
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
    pub next_continuation_token: Option<String>,
}

/// 远程对象存储（绑定单个存储桶）
#[async_trait]
pub trait ObjectClient: Send + Sync {
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), RemoteError>;

    /// 返回未读取的响应体，调用方不读取时不会下载内容
    async fn get_object(&self, key: &str) -> Result<ObjectBody, RemoteError>;

    async fn delete_object(&self, key: &str) -> Result<(), RemoteError>;

    async fn list_objects_v2(&self, request: &ListObjectsRequest) -> Result<ListObjectsPage, RemoteError>;
}

/// 客户端构造器，驱动首次使用时调用
pub trait ClientConnector: Send + Sync {
    fn connect(&self, config: &OssConfig) -> Result<Arc<dyn ObjectClient>, RemoteError>;
}

/// rust-s3 连接器
pub struct S3Connector;

impl ClientConnector for S3Connector {
    fn connect(&self, config: &OssConfig) -> Result<Arc<dyn ObjectClient>, RemoteError> {
        let credentials = Credentials::new(
            Some(&config.access_key_id),
            Some(&config.access_key_secret),
            None,
            None,
            None,
        )
        .map_err(|e| RemoteError::Setup(format!("创建OSS凭证失败: {}", e)))?;

        let endpoint = config.service_endpoint();
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: endpoint.clone(),
        };

        let bucket = Bucket::new(&config.bucket_name, region, credentials)
            .map_err(|e| RemoteError::Setup(format!("创建OSS Bucket失败: {}", e)))?;
        // OSS使用虚拟主机风格，路径风格仅用于兼容S3的自建服务
        let bucket = if config.force_path_style {
            bucket.with_path_style()
        } else {
            bucket
        };

        tracing::info!("OSS client created: bucket={}, endpoint={}", config.bucket_name, endpoint);
        Ok(Arc::new(S3ObjectClient { bucket }))
    }
}

/// rust-s3 客户端
pub struct S3ObjectClient {
    bucket: Box<Bucket>,
}

fn check_status(key: &str, status: u16) -> Result<(), RemoteError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(RemoteError::Status { key: key.to_string(), status })
    }
}

/// 解析失败时返回None并记录警告
fn parse_last_modified(key: &str, value: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!("OSS LastModified无法解析: key={}, value={}, error={}", key, value, e);
            None
        }
    }
}

#[async_trait]
impl ObjectClient for S3ObjectClient {
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), RemoteError> {
        let response = match &request.content_type {
            Some(content_type) => self.bucket
                .put_object_with_content_type(&request.key, &request.body, content_type)
                .await,
            None => self.bucket.put_object(&request.key, &request.body).await,
        }
        .map_err(|e| RemoteError::Request(format!("上传OSS对象失败: {}", e)))?;

        check_status(&request.key, response.status_code())
    }

    async fn get_object(&self, key: &str) -> Result<ObjectBody, RemoteError> {
        let response = self.bucket
            .get_object_stream(key)
            .await
            .map_err(|e| RemoteError::Request(format!("获取OSS对象失败: {}", e)))?;

        check_status(key, response.status_code)?;

        // 流式传输：将响应体转换为AsyncRead，不加载到内存
        let stream = response
            .bytes
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        Ok(Box::new(StreamReader::new(stream)))
    }

    async fn delete_object(&self, key: &str) -> Result<(), RemoteError> {
        let response = self.bucket
            .delete_object(key)
            .await
            .map_err(|e| RemoteError::Request(format!("删除OSS对象失败: {}", e)))?;

        check_status(key, response.status_code())
    }

    async fn list_objects_v2(&self, request: &ListObjectsRequest) -> Result<ListObjectsPage, RemoteError> {
        let (result, status) = self.bucket
            .list_page(
                request.prefix.clone(),
                request.delimiter.clone(),
                request.continuation_token.clone(),
                None,
                Some(request.max_keys),
            )
            .await
            .map_err(|e| RemoteError::Request(format!("列出OSS对象失败: {}", e)))?;

        check_status(&request.prefix, status)?;

        Ok(ListObjectsPage {
            contents: result
                .contents
                .into_iter()
                .map(|obj| ObjectSummary {
                    last_modified: parse_last_modified(&obj.key, &obj.last_modified),
                    key: obj.key,
                    size: obj.size as u64,
                })
                .collect(),
            common_prefixes: result
                .common_prefixes
                .unwrap_or_default()
                .into_iter()
                .map(|cp| cp.prefix)
                .collect(),
            is_truncated: result.is_truncated,
            next_continuation_token: result.next_continuation_token,
        })
    }
}
