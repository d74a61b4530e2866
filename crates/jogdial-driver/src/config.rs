//! 桥接配置
//!
//! 所有字段都有默认值（与设备出厂时的常量一致），配置文件只需写出要覆盖的项：
//!
//! ```toml
//! host = "cnc.local"
//! dialect = "http"
//! cycle_period_ms = 50
//! increments = [0.001, 0.01, 0.1, 1.0]
//!
//! [shuttle]
//! stop_on_unit_deflection = false
//! ```
//!
//! 默认配置文件路径：
//! - Linux: `~/.config/jogdial/config.toml`
//! - macOS: `~/Library/Application Support/jogdial/config.toml`

use jogdial_protocol::SpeedLevel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 后端方言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// 持久连接的消息总线（文本命令，支持控制与状态广播）
    #[default]
    Bus,
    /// 每条运动命令一次 HTTP GET
    Http,
}

/// 外圈策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShuttlePolicy {
    /// 外圈偏转 ±1 时按回中处理（停止连续运动）
    ///
    /// 部分设备回中时最后一次上报为 ±1 而不是 0。
    pub stop_on_unit_deflection: bool,
}

impl Default for ShuttlePolicy {
    fn default() -> Self {
        Self {
            stop_on_unit_deflection: true,
        }
    }
}

/// 桥接配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// 后端主机
    pub host: String,
    /// 后端端口
    pub port: u16,
    /// 后端侧的机床串口路径（消息总线方言的命令目标）
    pub backend_device: String,
    /// 后端方言
    pub dialect: Dialect,
    /// 后端固件为 TinyG 系列（外圈回中时额外发送停止并清空缓冲的命令）
    pub alternate_firmware: bool,
    /// 主循环周期（毫秒）
    pub cycle_period_ms: u64,
    /// 外圈满偏转时的最大进给速度（单位/分钟）
    pub max_feed: f64,
    /// 每周期距离放大系数（> 1，保证后端缓冲不被排空）
    pub overshoot: f64,
    /// 四个档位的步进距离（严格升序）
    pub increments: [f64; SpeedLevel::COUNT],
    /// 状态广播中的设备标识
    pub device_id: String,
    /// 消息总线的 WebSocket 路径
    pub bus_path: String,
    /// 后端连接失败后的重试间隔（毫秒）
    pub transport_retry_ms: u64,
    /// 设备打开/独占失败后的重试间隔（毫秒）
    pub device_retry_ms: u64,
    /// 外圈最后一次上报后，多久未再上报视为已回中（毫秒）
    pub synthetic_zero_delay_ms: u64,
    /// 命令队列容量
    pub queue_capacity: usize,
    /// HTTP 请求超时（毫秒）
    pub http_timeout_ms: u64,
    /// 外圈策略
    pub shuttle: ShuttlePolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8989,
            backend_device: "/dev/ttyACM0".to_string(),
            dialect: Dialect::Bus,
            alternate_firmware: false,
            cycle_period_ms: 100,
            max_feed: 1500.0,
            overshoot: 1.06,
            increments: [0.001, 0.01, 0.1, 1.0],
            device_id: "shuttlexpress".to_string(),
            bus_path: "/ws".to_string(),
            transport_retry_ms: 1000,
            device_retry_ms: 1000,
            synthetic_zero_delay_ms: 5,
            queue_capacity: 256,
            http_timeout_ms: 2000,
            shuttle: ShuttlePolicy::default(),
        }
    }
}

impl BridgeConfig {
    /// 从 TOML 文本解析（未出现的字段取默认值）
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 检查数值约束
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.overshoot.is_nan() || self.overshoot <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "overshoot must be greater than 1 (got {})",
                self.overshoot
            )));
        }
        if self.cycle_period_ms == 0 {
            return Err(ConfigError::Invalid("cycle_period_ms must be non-zero".into()));
        }
        if self.max_feed.is_nan() || self.max_feed <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_feed must be positive (got {})",
                self.max_feed
            )));
        }
        if !self.increments.iter().all(|inc| *inc > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "increments must be positive (got {:?})",
                self.increments
            )));
        }
        if !self.increments.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(ConfigError::Invalid(format!(
                "increments must be strictly ascending (got {:?})",
                self.increments
            )));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be non-zero".into()));
        }
        Ok(())
    }

    /// 档位对应的步进距离
    pub fn increment(&self, level: SpeedLevel) -> f64 {
        self.increments[level.index()]
    }

    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_period_ms)
    }

    pub fn transport_retry(&self) -> Duration {
        Duration::from_millis(self.transport_retry_ms)
    }

    pub fn device_retry(&self) -> Duration {
        Duration::from_millis(self.device_retry_ms)
    }

    pub fn synthetic_zero_delay(&self) -> Duration {
        Duration::from_millis(self.synthetic_zero_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}
