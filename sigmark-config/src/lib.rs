use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `SIGMARK_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("SIGMARK_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 查看器与签名标记的默认参数。
#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "ViewerConfig::default_initial_scale")]
    pub initial_scale: f64,
    #[serde(default = "ViewerConfig::default_zoom_step")]
    pub zoom_step: f64,
    #[serde(default = "ViewerConfig::default_mark_width")]
    pub mark_width: f64,
    #[serde(default = "ViewerConfig::default_mark_height")]
    pub mark_height: f64,
}

impl ViewerConfig {
    fn default_initial_scale() -> f64 {
        1.0
    }

    fn default_zoom_step() -> f64 {
        0.1
    }

    fn default_mark_width() -> f64 {
        160.0
    }

    fn default_mark_height() -> f64 {
        60.0
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            initial_scale: Self::default_initial_scale(),
            zoom_step: Self::default_zoom_step(),
            mark_width: Self::default_mark_width(),
            mark_height: Self::default_mark_height(),
        }
    }
}

/// 文档签名服务。未配置 `base_url` 时仅演练，不发送请求。
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "ServiceConfig::default_sign_path")]
    pub sign_path: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "ServiceConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ServiceConfig {
    fn default_sign_path() -> String {
        "/api/signatures/sign".to_string()
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    /// 拼接签名接口的完整地址。
    pub fn sign_endpoint(&self) -> Option<String> {
        let base = self.base_url.as_deref()?.trim_end_matches('/');
        let path = self.sign_path.trim_start_matches('/');
        Some(format!("{base}/{path}"))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            sign_path: Self::default_sign_path(),
            auth_token: None,
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
