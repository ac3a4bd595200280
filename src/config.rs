//! Application configuration module / 应用配置模块
//!
//! Loads shared OSS options and named storages from config.json, then lets
//! ALIYUN_OSS_* environment variables override them.
//! Creates default config file on first run / 首次运行时创建默认配置文件

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Global configuration instance / 全局配置实例
static CONFIG: OnceCell<Arc<RwLock<AppConfig>>> = OnceCell::new();

/// Environment variable -> option name / 环境变量与配置项的对应关系
const ENV_OPTIONS: [(&str, &str); 6] = [
    ("ALIYUN_OSS_ACCESS_KEY_ID", "access_key_id"),
    ("ALIYUN_OSS_ACCESS_KEY_SECRET", "access_key_secret"),
    ("ALIYUN_OSS_BUCKET_NAME", "bucket_name"),
    ("ALIYUN_OSS_REGION", "region"),
    ("ALIYUN_OSS_INTERNAL_ENDPOINT", "endpoint"),
    ("ALIYUN_OSS_PUBLIC_URL_DOMAIN", "public_url_domain"),
];

/// Application configuration / 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// OSS options shared by every storage / 共享的OSS配置
    #[serde(default)]
    pub oss: OssSection,
    /// Named storages / 存储列表
    #[serde(default = "default_storages")]
    pub storages: Vec<StorageMount>,
}

/// Shared OSS options, all optional here; the driver validates them / OSS配置
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct OssSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Internal endpoint override / 内网端点
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url_domain: Option<String>,
}

/// A named storage inside the shared bucket / 存储挂载
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageMount {
    /// Storage alias, e.g. "user_upload" / 存储名称
    pub name: String,
    /// Key prefix inside the bucket / 对象键前缀
    #[serde(default)]
    pub prefix: String,
    /// Driver type / 驱动类型
    #[serde(default = "default_driver")]
    pub driver: String,
}

impl StorageMount {
    pub fn new(name: &str, prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            driver: default_driver(),
        }
    }
}

fn default_driver() -> String {
    "oss".to_string()
}

fn default_storages() -> Vec<StorageMount> {
    vec![
        StorageMount::new("default", "default"),
        StorageMount::new("user_upload", "user_upload"),
        StorageMount::new("generated", "generated"),
        StorageMount::new("staticfiles", "django_static"),
    ]
}

impl OssSection {
    fn slot(&mut self, option: &str) -> Option<&mut Option<String>> {
        match option {
            "access_key_id" => Some(&mut self.access_key_id),
            "access_key_secret" => Some(&mut self.access_key_secret),
            "bucket_name" => Some(&mut self.bucket_name),
            "region" => Some(&mut self.region),
            "endpoint" => Some(&mut self.endpoint),
            "public_url_domain" => Some(&mut self.public_url_domain),
            _ => None,
        }
    }

    fn entries(&self) -> [(&'static str, &Option<String>); 6] {
        [
            ("access_key_id", &self.access_key_id),
            ("access_key_secret", &self.access_key_secret),
            ("bucket_name", &self.bucket_name),
            ("region", &self.region),
            ("endpoint", &self.endpoint),
            ("public_url_domain", &self.public_url_domain),
        ]
    }
}

// Never print the secret / 不输出密钥
impl std::fmt::Debug for OssSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssSection")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &self.access_key_secret.as_ref().map(|_| "***"))
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("public_url_domain", &self.public_url_domain)
            .finish()
    }
}

impl AppConfig {
    /// Default config with the standard storages / 默认配置
    pub fn with_default_storages() -> Self {
        Self {
            oss: OssSection::default(),
            storages: default_storages(),
        }
    }

    /// Override OSS options from the process environment / 使用环境变量覆盖
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Override OSS options from any variable lookup / 从任意来源覆盖
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, option) in ENV_OPTIONS {
            if let Some(value) = lookup(var) {
                if let Some(slot) = self.oss.slot(option) {
                    tracing::debug!("OSS option {} set from {}", option, var);
                    *slot = Some(value);
                }
            }
        }
    }

    /// Flat option mapping for one storage; absent values are left out / 生成存储配置项
    pub fn storage_options(&self, mount: &StorageMount) -> HashMap<String, String> {
        let mut options: HashMap<String, String> = self
            .oss
            .entries()
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|v| (key.to_string(), v)))
            .collect();
        options.insert("prefix".to_string(), mount.prefix.clone());
        options
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config_from(config_path: &Path) -> Result<AppConfig, String> {
    let mut config = if config_path.exists() {
        // Load existing config / 加载现有配置
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        config
    } else {
        // Create default config / 创建默认配置
        let config = AppConfig::with_default_storages();
        save_config_to(&config, config_path)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        config
    };

    // Env overrides are never written back to the file / 环境变量不写入配置文件
    config.apply_env();
    Ok(config)
}

/// Load configuration from ./config.json / 加载默认路径的配置
pub fn load_config() -> Result<AppConfig, String> {
    load_config_from(&get_config_path())
}

/// Save configuration to file / 保存配置到文件
pub fn save_config_to(config: &AppConfig, config_path: &Path) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}

/// Initialize global configuration / 初始化全局配置
pub fn init_config() -> Result<Arc<RwLock<AppConfig>>, String> {
    let config = load_config()?;

    let config_arc = Arc::new(RwLock::new(config));

    CONFIG.set(config_arc.clone())
        .map_err(|_| "Config already initialized".to_string())?;

    Ok(config_arc)
}

/// Get global configuration instance / 获取全局配置实例
pub fn get_config() -> Arc<RwLock<AppConfig>> {
    CONFIG.get_or_init(|| {
        let config = load_config().unwrap_or_else(|_| AppConfig::with_default_storages());
        Arc::new(RwLock::new(config))
    }).clone()
}

/// Get a read-only snapshot of current config / 获取当前配置的只读快照
pub fn config() -> AppConfig {
    get_config().read().clone()
}
