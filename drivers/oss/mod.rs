//! 阿里云OSS存储驱动
//!
//! 通过S3兼容协议访问OSS，多个存储可以共用同一存储桶，按前缀隔离。

mod config;
mod driver;
mod factory;
pub mod client;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{OssConfig, REQUIRED_OPTIONS};
pub use driver::OssStorage;
pub use factory::OssStorageFactory;
pub use client::{ClientConnector, ObjectClient, S3Connector};
