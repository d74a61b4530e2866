//! Builder 模式实现
//!
//! 提供链式构造 [`Bridge`] 的便捷方式，并在构造前校验配置。

use crate::auxiliary::{AuxInput, StatusIndicator};
use crate::bridge::Bridge;
use crate::config::{BridgeConfig, Dialect};
use crate::error::DriverError;
use jogdial_input::InputSource;
use jogdial_transport::{BusSink, CommandSink, HttpSink, TransportError};
use std::path::PathBuf;

/// 按配置中的方言创建后端接收端
pub fn backend_sink(config: &BridgeConfig) -> Result<Box<dyn CommandSink + Send>, TransportError> {
    match config.dialect {
        Dialect::Bus => Ok(Box::new(BusSink::new(
            config.host.clone(),
            config.port,
            config.bus_path.clone(),
        ))),
        Dialect::Http => Ok(Box::new(HttpSink::with_timeout(
            &config.host,
            config.port,
            config.http_timeout(),
        )?)),
    }
}

/// Bridge Builder（链式构造）
///
/// # Example
///
/// ```
/// use jogdial_driver::{BridgeBuilder, BridgeConfig, Dialect};
/// use jogdial_input::MockInputSource;
/// use jogdial_transport::MockSink;
///
/// let (input, _device) = MockInputSource::new();
/// let (sink, _backend) = MockSink::new();
///
/// let bridge = BridgeBuilder::new("/dev/input/event0")
///     .config(BridgeConfig {
///         dialect: Dialect::Http,
///         ..BridgeConfig::default()
///     })
///     .build(input, sink)
///     .unwrap();
/// assert_eq!(bridge.config().dialect, Dialect::Http);
/// ```
pub struct BridgeBuilder {
    /// 输入设备路径（`/dev/input/eventN`）
    device_path: PathBuf,
    config: BridgeConfig,
    aux: Option<Box<dyn AuxInput + Send>>,
    indicator: Option<Box<dyn StatusIndicator + Send>>,
}

impl BridgeBuilder {
    pub fn new(device_path: impl Into<PathBuf>) -> Self {
        Self {
            device_path: device_path.into(),
            config: BridgeConfig::default(),
            aux: None,
            indicator: None,
        }
    }

    /// 设置配置（默认 [`BridgeConfig::default()`]）
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置辅助输入（默认无）
    pub fn aux_input(mut self, aux: impl AuxInput + Send + 'static) -> Self {
        self.aux = Some(Box::new(aux));
        self
    }

    /// 设置状态指示器（默认无）
    pub fn indicator(mut self, indicator: impl StatusIndicator + Send + 'static) -> Self {
        self.indicator = Some(Box::new(indicator));
        self
    }

    /// 使用给定的输入源与接收端构造
    pub fn build<I: InputSource, S: CommandSink>(
        self,
        input: I,
        sink: S,
    ) -> Result<Bridge<I, S>, DriverError> {
        self.config.validate()?;

        let mut bridge = Bridge::new(self.config, self.device_path, input, sink);
        if let Some(aux) = self.aux {
            bridge.set_aux_input(aux);
        }
        if let Some(indicator) = self.indicator {
            bridge.set_indicator(indicator);
        }
        Ok(bridge)
    }

    /// 使用 evdev 输入源与配置方言对应的接收端构造
    #[cfg(target_os = "linux")]
    pub fn build_default(
        self,
    ) -> Result<Bridge<jogdial_input::EvdevInputSource, Box<dyn CommandSink + Send>>, DriverError>
    {
        self.config.validate()?;
        let sink = backend_sink(&self.config)?;
        self.build(jogdial_input::EvdevInputSource::new(), sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use jogdial_input::MockInputSource;
    use jogdial_transport::MockSink;

    #[test]
    fn test_build_rejects_invalid_config() {
        let (input, _) = MockInputSource::new();
        let (sink, _) = MockSink::new();
        let result = BridgeBuilder::new("/dev/input/event0")
            .config(BridgeConfig {
                overshoot: 0.9,
                ..BridgeConfig::default()
            })
            .build(input, sink);
        assert!(matches!(
            result,
            Err(DriverError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_backend_sink_per_dialect() {
        let bus = backend_sink(&BridgeConfig::default()).unwrap();
        assert_eq!(bus.endpoint(), "ws://localhost:8989/ws");

        let http = backend_sink(&BridgeConfig {
            dialect: Dialect::Http,
            host: "10.0.0.5".into(),
            port: 8080,
            ..BridgeConfig::default()
        })
        .unwrap();
        assert_eq!(http.endpoint(), "http://10.0.0.5:8080");
    }
}
