//! Storage error taxonomy / 存储错误类型

use thiserror::Error;

/// Result type for storage operations / 存储操作结果
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage errors / 存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// One or more required options missing or empty / 缺少必需配置项
    #[error("Missing required OSS options: {}", .missing.join(", "))]
    Configuration { missing: Vec<String> },

    /// `open` called with anything other than read-binary / 不支持的打开模式
    #[error("Unsupported open mode {0:?}: only read-binary (\"rb\") is supported")]
    UnsupportedMode(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Failure reported by (or while talking to) the remote object store / 远程服务错误
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Client construction failed (credentials, region, bucket) / 客户端创建失败
    #[error("OSS client setup failed: {0}")]
    Setup(String),

    /// Transport or protocol failure inside the client / 请求失败
    #[error("OSS request failed: {0}")]
    Request(String),

    /// Service answered with a non-success status / 非成功状态码
    #[error("OSS returned HTTP {status} for {key:?}")]
    Status { key: String, status: u16 },

    /// Reading the response body failed / 读取响应体失败
    #[error("OSS response body error: {0}")]
    Body(#[from] std::io::Error),
}

impl RemoteError {
    /// Whether the service reported the object as missing / 是否为对象不存在
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::Status { status: 404, .. })
    }
}
