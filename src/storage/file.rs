//! File handles passed across the storage boundary / 存储文件句柄
//!
//! `StorageFile` wraps a remote response body and can be drained exactly once.
//! `ContentFile` is what callers hand to `save`.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::{RemoteError, StorageResult};

/// Readable object body (remote response or caller-provided stream) / 可读的对象数据流
pub type ObjectBody = Box<dyn AsyncRead + Send + Unpin>;

enum ReadState {
    Unread(ObjectBody),
    Drained,
}

/// Forward-only, single-pass handle on a remote object / 只读一次的文件句柄
pub struct StorageFile {
    name: String,
    state: ReadState,
}

impl StorageFile {
    pub fn new(name: impl Into<String>, body: ObjectBody) -> Self {
        Self {
            name: name.into(),
            state: ReadState::Unread(body),
        }
    }

    /// Logical name the handle was opened with / 打开时的逻辑名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the body has been consumed (or released) / 是否已读取
    pub fn is_drained(&self) -> bool {
        matches!(self.state, ReadState::Drained)
    }

    /// Drain the whole body on first call; every later call returns empty bytes
    /// without touching the network. / 首次读取返回全部内容，之后返回空
    pub async fn read(&mut self) -> StorageResult<Bytes> {
        match std::mem::replace(&mut self.state, ReadState::Drained) {
            ReadState::Unread(mut body) => {
                let mut buf = Vec::new();
                body.read_to_end(&mut buf).await.map_err(RemoteError::from)?;
                tracing::debug!("Drained {} bytes from {}", buf.len(), self.name);
                Ok(Bytes::from(buf))
            }
            ReadState::Drained => Ok(Bytes::new()),
        }
    }

    /// Release the underlying body. Safe to call more than once. / 释放底层连接
    pub fn close(&mut self) {
        self.state = ReadState::Drained;
    }
}

impl std::fmt::Debug for StorageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageFile")
            .field("name", &self.name)
            .field("drained", &self.is_drained())
            .finish()
    }
}

/// Save payload / 上传内容
pub enum ContentBody {
    Bytes(Bytes),
    Reader(ObjectBody),
}

/// Content handed to `Storage::save`, with an optional declared MIME type / 待保存的内容
pub struct ContentFile {
    body: ContentBody,
    content_type: Option<String>,
}

impl ContentFile {
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            body: ContentBody::Bytes(data.into()),
            content_type: None,
        }
    }

    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            body: ContentBody::Reader(Box::new(reader)),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Materialize the content in memory; streams are drained fully. / 读取全部内容到内存
    pub async fn into_parts(self) -> StorageResult<(Bytes, Option<String>)> {
        let data = match self.body {
            ContentBody::Bytes(data) => data,
            ContentBody::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await.map_err(RemoteError::from)?;
                Bytes::from(buf)
            }
        };
        Ok((data, self.content_type))
    }
}

impl From<Bytes> for ContentFile {
    fn from(data: Bytes) -> Self {
        Self::from_bytes(data)
    }
}

impl From<Vec<u8>> for ContentFile {
    fn from(data: Vec<u8>) -> Self {
        Self::from_bytes(data)
    }
}

impl From<&'static [u8]> for ContentFile {
    fn from(data: &'static [u8]) -> Self {
        Self::from_bytes(Bytes::from_static(data))
    }
}
