//! 配置加载与命令行覆盖
//!
//! 优先级：命令行参数 > `--config` 指定的文件 > 默认配置文件 > 内置默认值

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use jogdial_driver::{BridgeConfig, Dialect};
use std::path::{Path, PathBuf};

/// 默认配置文件路径（`<config_dir>/jogdial/config.toml`）
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("jogdial").join("config.toml"))
}

/// 加载配置文件
///
/// 显式指定的文件必须存在；默认路径不存在时使用内置默认值。
pub fn load(explicit: Option<&Path>) -> Result<BridgeConfig> {
    if let Some(path) = explicit {
        return BridgeConfig::load(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()));
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            tracing::debug!("Using config file '{}'", path.display());
            BridgeConfig::load(&path)
                .with_context(|| format!("Failed to load config '{}'", path.display()))
        },
        _ => Ok(BridgeConfig::default()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DialectArg {
    /// 持久连接的消息总线（WebSocket）
    Bus,
    /// 每条命令一次 HTTP GET
    Http,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Bus => Dialect::Bus,
            DialectArg::Http => Dialect::Http,
        }
    }
}

/// 覆盖配置文件的命令行参数
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// 后端主机
    #[arg(long)]
    pub host: Option<String>,

    /// 后端端口
    #[arg(long)]
    pub port: Option<u16>,

    /// 后端侧的机床串口路径
    #[arg(long, value_name = "PATH")]
    pub backend_device: Option<String>,

    /// 后端方言
    #[arg(long, value_enum)]
    pub dialect: Option<DialectArg>,

    /// 后端固件为 TinyG 系列
    #[arg(long)]
    pub tinyg: bool,

    /// 主循环周期（毫秒）
    #[arg(long, value_name = "MS")]
    pub cycle_ms: Option<u64>,

    /// 外圈满偏转时的最大进给速度
    #[arg(long)]
    pub max_feed: Option<f64>,

    /// 每周期距离放大系数（> 1）
    #[arg(long)]
    pub overshoot: Option<f64>,

    /// 四个档位的步进距离，逗号分隔（如 0.001,0.01,0.1,1）
    #[arg(long, value_delimiter = ',', num_args = 4)]
    pub increments: Option<Vec<f64>>,

    /// 外圈偏转 ±1 时继续运动（默认视为回中）
    #[arg(long)]
    pub move_on_unit_deflection: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut BridgeConfig) -> Result<()> {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(device) = &self.backend_device {
            config.backend_device = device.clone();
        }
        if let Some(dialect) = self.dialect {
            config.dialect = dialect.into();
        }
        if self.tinyg {
            config.alternate_firmware = true;
        }
        if let Some(cycle) = self.cycle_ms {
            config.cycle_period_ms = cycle;
        }
        if let Some(max_feed) = self.max_feed {
            config.max_feed = max_feed;
        }
        if let Some(overshoot) = self.overshoot {
            config.overshoot = overshoot;
        }
        if let Some(increments) = &self.increments {
            config.increments = increments
                .as_slice()
                .try_into()
                .map_err(|_| anyhow::anyhow!("--increments takes exactly 4 values"))?;
        }
        if self.move_on_unit_deflection {
            config.shuttle.stop_on_unit_deflection = false;
        }

        config.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = BridgeConfig::default();
        Overrides::default().apply(&mut config).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = BridgeConfig::default();
        let overrides = Overrides {
            host: Some("cnc.local".into()),
            dialect: Some(DialectArg::Http),
            tinyg: true,
            increments: Some(vec![0.005, 0.05, 0.5, 5.0]),
            move_on_unit_deflection: true,
            ..Overrides::default()
        };
        overrides.apply(&mut config).unwrap();

        assert_eq!(config.host, "cnc.local");
        assert_eq!(config.dialect, Dialect::Http);
        assert!(config.alternate_firmware);
        assert_eq!(config.increments, [0.005, 0.05, 0.5, 5.0]);
        assert!(!config.shuttle.stop_on_unit_deflection);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut config = BridgeConfig::default();
        let overrides = Overrides {
            overshoot: Some(1.0),
            ..Overrides::default()
        };
        assert!(overrides.apply(&mut config).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jogdial.toml");
        std::fs::write(&path, "port = 9000\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.port, 9000);

        assert!(load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
