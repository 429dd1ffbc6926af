use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

use crate::errors::{Result, ShortstatError};
use crate::histogram::{MAX_PRECISION, MAX_WINDOW_DAYS, MIN_PRECISION};
use crate::services::suffix::MIN_SUFFIX_BYTES;

/// 键值存储后端类型
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    /// 进程内存储，重启后数据丢失
    #[default]
    Memory,
    Redis,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            _ => Err(format!("Invalid backend: '{}'. Valid: memory, redis", s)),
        }
    }
}

/// What happens to a visit that lands after the histogram window has closed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WindowExhaustion {
    /// Report `OutOfRangeValue` to the visit sink; neither counter changes.
    #[default]
    Reject,
    /// Clamp late visits into the last bucket of the window.
    Saturate,
}

impl std::fmt::Display for WindowExhaustion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl std::str::FromStr for WindowExhaustion {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "saturate" => Ok(Self::Saturate),
            _ => Err(format!(
                "Invalid window exhaustion policy: '{}'. Valid: reject, saturate",
                s
            )),
        }
    }
}

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - server: 服务器地址、端口
/// - store: 键值存储后端与重试配置
/// - links: 短链生成参数
/// - histogram: 访问直方图窗口与精度
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub links: LinkConfig,
    #[serde(default)]
    pub histogram: HistogramConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：SS，分隔符：__
    /// 示例：SS__SERVER__PORT=9999
    pub fn load() -> Self {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 SS，分隔符 __
            .add_source(
                Environment::with_prefix("SS")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 启动前校验，非法值直接拒绝而不是静默修正
    pub fn validate(&self) -> Result<()> {
        if self.links.suffix_bytes < MIN_SUFFIX_BYTES {
            return Err(ShortstatError::config(format!(
                "links.suffix_bytes must be at least {}, got {}",
                MIN_SUFFIX_BYTES, self.links.suffix_bytes
            )));
        }
        if self.links.max_generate_attempts == 0 {
            return Err(ShortstatError::config(
                "links.max_generate_attempts must be positive",
            ));
        }
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&self.histogram.precision) {
            return Err(ShortstatError::config(format!(
                "histogram.precision must be within {}..={}, got {}",
                MIN_PRECISION, MAX_PRECISION, self.histogram.precision
            )));
        }
        if self.histogram.window_days == 0 || self.histogram.window_days > MAX_WINDOW_DAYS {
            return Err(ShortstatError::config(format!(
                "histogram.window_days must be within 1..={}, got {}",
                MAX_WINDOW_DAYS, self.histogram.window_days
            )));
        }
        if self.store.max_update_attempts == 0 {
            return Err(ShortstatError::config(
                "store.max_update_attempts must be positive",
            ));
        }
        Ok(())
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

/// 键值存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// 单次后端调用超时
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// 乐观并发更新的最大尝试次数
    #[serde(default = "default_max_update_attempts")]
    pub max_update_attempts: u32,
}

/// 短链生成配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(default = "default_suffix_bytes")]
    pub suffix_bytes: usize,
    #[serde(default = "default_max_generate_attempts")]
    pub max_generate_attempts: u32,
    #[serde(default = "default_max_alias_length")]
    pub max_alias_length: usize,
}

/// 访问直方图配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramConfig {
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// 有效数字位数
    #[serde(default = "default_precision")]
    pub precision: u8,
    #[serde(default)]
    pub exhaustion: WindowExhaustion,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_key_prefix() -> String {
    "shortstat:".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_max_update_attempts() -> u32 {
    16
}

fn default_suffix_bytes() -> usize {
    8
}

fn default_max_generate_attempts() -> u32 {
    8
}

fn default_max_alias_length() -> usize {
    64
}

fn default_window_days() -> u32 {
    30
}

fn default_precision() -> u8 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_file() -> Option<String> {
    None
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            redis_url: default_redis_url(),
            key_prefix: default_key_prefix(),
            timeout_ms: default_timeout_ms(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            max_update_attempts: default_max_update_attempts(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            suffix_bytes: default_suffix_bytes(),
            max_generate_attempts: default_max_generate_attempts(),
            max_alias_length: default_max_alias_length(),
        }
    }
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            precision: default_precision(),
            exhaustion: WindowExhaustion::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: default_log_file(),
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}
