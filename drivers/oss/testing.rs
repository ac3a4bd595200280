//! 测试用的内存对象存储

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, ReadBuf};

use crate::storage::{ObjectBody, RemoteError};
use super::client::{
    ClientConnector, ListObjectsPage, ListObjectsRequest, ObjectClient, ObjectSummary, PutObjectRequest,
};
use super::config::OssConfig;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: Option<String>,
    pub last_modified: DateTime<Utc>,
}

/// 内存存储桶，模拟S3的分隔符分组与按数量分页
#[derive(Default)]
pub struct MemoryObjectClient {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    fail_status: Mutex<Option<u16>>,
    calls: Mutex<Vec<String>>,
    list_requests: Mutex<Vec<ListObjectsRequest>>,
    body_bytes_read: Arc<AtomicUsize>,
    open_bodies: Arc<AtomicUsize>,
}

/// 统计响应体读取字节数和存活数量的读取器
struct CountingBody {
    inner: io::Cursor<Bytes>,
    bytes_read: Arc<AtomicUsize>,
    open_bodies: Arc<AtomicUsize>,
}

impl AsyncRead for CountingBody {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        let read = buf.filled().len() - before;
        self.bytes_read.fetch_add(read, Ordering::SeqCst);
        poll
    }
}

impl Drop for CountingBody {
    fn drop(&mut self) {
        self.open_bodies.fetch_sub(1, Ordering::SeqCst);
    }
}

enum ListEntry {
    Object(ObjectSummary),
    Prefix(String),
}

impl ListEntry {
    fn marker(&self) -> &str {
        match self {
            ListEntry::Object(obj) => &obj.key,
            ListEntry::Prefix(prefix) => prefix,
        }
    }
}

impl MemoryObjectClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 直接写入对象，不记录调用
    pub fn insert(&self, key: &str, data: &[u8]) {
        let last_modified = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::seconds(self.objects.lock().len() as i64);
        self.objects.lock().insert(
            key.to_string(),
            StoredObject {
                data: Bytes::copy_from_slice(data),
                content_type: None,
                last_modified,
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }

    /// 之后的所有调用都以该HTTP状态码失败
    pub fn fail_with(&self, status: Option<u16>) {
        *self.fail_status.lock() = status;
    }

    /// 已发出的操作，如 `get:uploads/a.txt`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn list_requests(&self) -> Vec<ListObjectsRequest> {
        self.list_requests.lock().clone()
    }

    /// 所有响应体累计被读取的字节数
    pub fn body_bytes_read(&self) -> usize {
        self.body_bytes_read.load(Ordering::SeqCst)
    }

    /// 尚未释放的响应体数量
    pub fn open_bodies(&self) -> usize {
        self.open_bodies.load(Ordering::SeqCst)
    }

    fn record(&self, op: &str, key: &str) -> Result<(), RemoteError> {
        self.calls.lock().push(format!("{}:{}", op, key));
        match *self.fail_status.lock() {
            Some(status) => Err(RemoteError::Status { key: key.to_string(), status }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectClient for MemoryObjectClient {
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), RemoteError> {
        self.record("put", &request.key)?;
        let mut objects = self.objects.lock();
        let last_modified = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::seconds(objects.len() as i64);
        objects.insert(
            request.key,
            StoredObject {
                data: request.body,
                content_type: request.content_type,
                last_modified,
            },
        );
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<ObjectBody, RemoteError> {
        self.record("get", key)?;
        let data = self
            .objects
            .lock()
            .get(key)
            .map(|obj| obj.data.clone())
            .ok_or_else(|| RemoteError::Status { key: key.to_string(), status: 404 })?;
        self.open_bodies.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingBody {
            inner: io::Cursor::new(data),
            bytes_read: self.body_bytes_read.clone(),
            open_bodies: self.open_bodies.clone(),
        }))
    }

    async fn delete_object(&self, key: &str) -> Result<(), RemoteError> {
        self.record("delete", key)?;
        self.objects.lock().remove(key);
        Ok(())
    }

    async fn list_objects_v2(&self, request: &ListObjectsRequest) -> Result<ListObjectsPage, RemoteError> {
        self.record("list", &request.prefix)?;
        self.list_requests.lock().push(request.clone());

        let objects = self.objects.lock();
        let mut entries: Vec<ListEntry> = Vec::new();
        for (key, obj) in objects.range(request.prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&request.prefix) else {
                break;
            };
            let grouped = request
                .delimiter
                .as_deref()
                .and_then(|d| rest.find(d).map(|idx| format!("{}{}", request.prefix, &rest[..idx + d.len()])));
            match grouped {
                Some(prefix) => {
                    if !matches!(entries.last(), Some(ListEntry::Prefix(last)) if *last == prefix) {
                        entries.push(ListEntry::Prefix(prefix));
                    }
                }
                None => entries.push(ListEntry::Object(ObjectSummary {
                    key: key.clone(),
                    size: obj.data.len() as u64,
                    last_modified: Some(obj.last_modified),
                })),
            }
        }

        let remaining: Vec<ListEntry> = entries
            .into_iter()
            .filter(|e| request.continuation_token.as_deref().map_or(true, |t| e.marker() > t))
            .collect();
        let max_keys = request.max_keys.max(1);
        let is_truncated = remaining.len() > max_keys;

        let mut page = ListObjectsPage {
            is_truncated,
            ..Default::default()
        };
        for entry in remaining.into_iter().take(max_keys) {
            if is_truncated {
                page.next_continuation_token = Some(entry.marker().to_string());
            }
            match entry {
                ListEntry::Object(obj) => page.contents.push(obj),
                ListEntry::Prefix(prefix) => page.common_prefixes.push(prefix),
            }
        }
        Ok(page)
    }
}

/// 按顺序返回预设的列表页，忽略请求内容
#[derive(Default)]
pub struct ScriptedListClient {
    pages: Mutex<VecDeque<ListObjectsPage>>,
    tokens: Mutex<Vec<Option<String>>>,
}

impl ScriptedListClient {
    pub fn new(pages: Vec<ListObjectsPage>) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(pages.into()),
            tokens: Mutex::new(Vec::new()),
        })
    }

    /// 每次列表调用收到的续传令牌
    pub fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().clone()
    }
}

#[async_trait]
impl ObjectClient for ScriptedListClient {
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), RemoteError> {
        Err(RemoteError::Status { key: request.key, status: 501 })
    }

    async fn get_object(&self, key: &str) -> Result<ObjectBody, RemoteError> {
        Err(RemoteError::Status { key: key.to_string(), status: 501 })
    }

    async fn delete_object(&self, key: &str) -> Result<(), RemoteError> {
        Err(RemoteError::Status { key: key.to_string(), status: 501 })
    }

    async fn list_objects_v2(&self, request: &ListObjectsRequest) -> Result<ListObjectsPage, RemoteError> {
        self.tokens.lock().push(request.continuation_token.clone());
        Ok(self.pages.lock().pop_front().unwrap_or_default())
    }
}

/// 返回固定客户端并统计创建次数
pub struct CountingConnector {
    client: Arc<dyn ObjectClient>,
    connects: AtomicUsize,
    delay: Duration,
}

impl CountingConnector {
    pub fn new(client: Arc<dyn ObjectClient>) -> Arc<Self> {
        Arc::new(Self {
            client,
            connects: AtomicUsize::new(0),
            delay: Duration::ZERO,
        })
    }

    /// 延迟创建，扩大首次使用的并发窗口
    pub fn with_delay(client: Arc<dyn ObjectClient>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            client,
            connects: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl ClientConnector for CountingConnector {
    fn connect(&self, _config: &OssConfig) -> Result<Arc<dyn ObjectClient>, RemoteError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(self.client.clone())
    }
}

/// 总是失败的构造器，模拟凭证错误
pub struct FailingConnector;

impl ClientConnector for FailingConnector {
    fn connect(&self, _config: &OssConfig) -> Result<Arc<dyn ObjectClient>, RemoteError> {
        Err(RemoteError::Setup("invalid credentials".to_string()))
    }
}
