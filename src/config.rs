use crate::error::{AppError, AppResult, ConfigError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 内容生成服务的 API 地址
    pub api_base_url: String,
    /// 会话记录存放目录
    pub session_dir: String,
    /// 会话有效期（小时）
    pub session_ttl_hours: i64,
    /// 批量任务轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 上传超时（秒）
    pub upload_timeout_secs: u64,
    /// 下载超时（秒）
    pub download_timeout_secs: u64,
    /// 导出文件存放目录
    pub export_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            session_dir: ".blog_sessions".to_string(),
            session_ttl_hours: 24,
            poll_interval_secs: 3,
            upload_timeout_secs: 30,
            download_timeout_secs: 60,
            export_dir: "exports".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果设置了 `CONFIG_FILE`，先读取该 TOML 文件，再用环境变量覆盖
    pub fn from_env() -> AppResult<Self> {
        let base = match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        base.apply_env()
    }

    /// 从 TOML 文件加载配置，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| {
            AppError::Config(ConfigError::TomlParseFailed {
                message: e.to_string(),
            })
        })
    }

    fn apply_env(self) -> AppResult<Self> {
        Ok(Self {
            api_base_url: std::env::var("API_BASE_URL").unwrap_or(self.api_base_url),
            session_dir: std::env::var("SESSION_DIR").unwrap_or(self.session_dir),
            session_ttl_hours: env_parse("SESSION_TTL_HOURS", "i64")?.unwrap_or(self.session_ttl_hours),
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS", "u64")?.unwrap_or(self.poll_interval_secs),
            upload_timeout_secs: env_parse("UPLOAD_TIMEOUT_SECS", "u64")?.unwrap_or(self.upload_timeout_secs),
            download_timeout_secs: env_parse("DOWNLOAD_TIMEOUT_SECS", "u64")?.unwrap_or(self.download_timeout_secs),
            export_dir: std::env::var("EXPORT_DIR").unwrap_or(self.export_dir),
            verbose_logging: env_parse("VERBOSE_LOGGING", "bool")?.unwrap_or(self.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
        })
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn session_path(&self) -> PathBuf {
        PathBuf::from(&self.session_dir)
    }
}

/// 解析环境变量；变量不存在返回 None，格式错误返回配置错误
fn env_parse<T: std::str::FromStr>(var_name: &str, expected_type: &str) -> AppResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
            AppError::Config(ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            })
        }),
        Err(_) => Ok(None),
    }
}
