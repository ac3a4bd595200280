//! OSS驱动配置

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::storage::{StorageError, StorageResult};

/// 必填配置项（按报告顺序），缺失或为空均视为缺失
pub const REQUIRED_OPTIONS: [&str; 5] = [
    "access_key_id",
    "access_key_secret",
    "bucket_name",
    "region",
    "public_url_domain",
];

/// OSS配置
#[derive(Clone, Serialize, Deserialize)]
pub struct OssConfig {
    /// Access Key ID
    pub access_key_id: String,
    /// Access Key Secret
    pub access_key_secret: String,
    /// 存储桶名称
    pub bucket_name: String,
    /// 区域，如 cn-hangzhou
    pub region: String,
    /// 自定义端点（如内网端点 oss-cn-hangzhou-internal.aliyuncs.com）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// 公网访问域名（CDN或绑定域名）
    pub public_url_domain: String,
    /// 对象键前缀，已去除末尾的 /
    #[serde(default)]
    pub prefix: String,
    /// 强制使用路径风格（而非虚拟主机风格）
    /// MinIO等S3兼容服务需要设置为true
    #[serde(default)]
    pub force_path_style: bool,
}

impl OssConfig {
    /// 从扁平配置项创建，一次性报告所有缺失的必填项
    pub fn from_options(options: &HashMap<String, String>) -> StorageResult<Self> {
        let missing: Vec<String> = REQUIRED_OPTIONS
            .iter()
            .filter(|opt| options.get(**opt).map_or(true, |v| v.is_empty()))
            .map(|opt| opt.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(StorageError::Configuration { missing });
        }

        let get = |key: &str| options.get(key).cloned().unwrap_or_default();

        Ok(Self {
            access_key_id: get("access_key_id"),
            access_key_secret: get("access_key_secret"),
            bucket_name: get("bucket_name"),
            region: get("region"),
            endpoint: options.get("endpoint").filter(|v| !v.is_empty()).cloned(),
            public_url_domain: get("public_url_domain"),
            prefix: get("prefix").trim_end_matches('/').to_string(),
            force_path_style: matches!(get("force_path_style").as_str(), "true" | "1"),
        })
    }

    /// 逻辑名称 -> 对象键
    pub fn object_key(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }

    /// 客户端请求的端点，未配置时使用区域公网端点
    pub fn service_endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) if endpoint.contains("://") => endpoint.clone(),
            Some(endpoint) => format!("https://{}", endpoint),
            None => format!("https://oss-{}.aliyuncs.com", self.region),
        }
    }

    /// 去掉协议的端点主机名，用于拼接直连地址
    pub fn endpoint_host(&self) -> Option<&str> {
        self.endpoint.as_deref().map(|endpoint| {
            endpoint
                .split_once("://")
                .map_or(endpoint, |(_, host)| host)
                .trim_end_matches('/')
        })
    }
}

// 不输出密钥
impl std::fmt::Debug for OssConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssConfig")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"***")
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("public_url_domain", &self.public_url_domain)
            .field("prefix", &self.prefix)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}
