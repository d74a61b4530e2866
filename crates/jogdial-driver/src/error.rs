//! 驱动层错误类型定义

use crate::config::ConfigError;
use crate::motion::SynthError;
use crate::queue::QueueError;
use jogdial_transport::TransportError;
use thiserror::Error;

/// 驱动层错误类型
///
/// 主循环只会因逻辑缺陷（命令超长、队列溢出）返回错误；
/// 设备与传输故障都在循环内部通过重连恢复。
#[derive(Error, Debug)]
pub enum DriverError {
    /// 命令合成失败
    #[error("Command synthesis error: {0}")]
    Synth(#[from] SynthError),

    /// 命令队列错误
    #[error("Command queue error: {0}")]
    Queue(#[from] QueueError),

    /// 后端接收端创建失败（启动前）
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 配置错误（启动前）
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::from(QueueError::Overflow { capacity: 4 });
        assert_eq!(
            err.to_string(),
            "Command queue error: Command queue overflow (capacity: 4)"
        );

        let err = DriverError::from(SynthError::CommandTooLong { len: 300, max: 256 });
        assert!(err.to_string().contains("300 bytes"));

        let err = DriverError::from(ConfigError::Invalid("bad".into()));
        assert_eq!(err.to_string(), "Configuration error: Invalid config: bad");
    }

    #[test]
    fn test_from_queue_error() {
        let err: DriverError = QueueError::Overflow { capacity: 1 }.into();
        match err {
            DriverError::Queue(QueueError::Overflow { capacity }) => assert_eq!(capacity, 1),
            _ => panic!("Expected Queue variant"),
        }
    }
}
