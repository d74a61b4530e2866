//! # Jogdial Input Layer
//!
//! 输入设备抽象层：打开设备、独占设备、就绪检查、读取单条事件。
//!
//! 解码器、命令队列和主循环只依赖 [`InputSource`] trait，
//! 因此可以在没有硬件的情况下用 `MockInputSource`（`mock` feature）测试。

use jogdial_protocol::{ProtocolError, RawEvent};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[cfg(target_os = "linux")]
pub mod evdev;

#[cfg(target_os = "linux")]
pub use evdev::EvdevInputSource;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockInputHandle, MockInputSource, MockRead};

/// 输入层统一错误类型
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to claim exclusive access: {0}")]
    Claim(#[source] std::io::Error),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("Malformed record: {0}")]
    Malformed(#[from] ProtocolError),

    #[error("Device not open")]
    NotOpen,
}

impl InputError {
    /// 是否是打开/独占阶段的错误（可重试）
    pub fn is_connect_error(&self) -> bool {
        matches!(self, InputError::Open { .. } | InputError::Claim(_))
    }
}

/// 输入源
///
/// 生命周期：`open` → `claim_exclusive` → (`poll_ready` / `read_one`)* → `close`。
/// `close` 之后可以再次 `open`（重连）。
pub trait InputSource {
    /// 打开设备节点
    fn open(&mut self, path: &Path) -> Result<(), InputError>;

    /// 独占设备，阻止其他进程（如桌面环境）收到事件
    fn claim_exclusive(&mut self) -> Result<(), InputError>;

    /// 检查是否有可读事件
    ///
    /// 主循环以 `Duration::ZERO` 调用，不得阻塞。
    fn poll_ready(&mut self, timeout: Duration) -> Result<bool, InputError>;

    /// 读取一条完整事件记录
    fn read_one(&mut self) -> Result<RawEvent, InputError>;

    /// 释放设备句柄（幂等）
    fn close(&mut self);

    /// 设备是否处于打开状态
    fn is_open(&self) -> bool;
}

impl<T: InputSource + ?Sized> InputSource for Box<T> {
    fn open(&mut self, path: &Path) -> Result<(), InputError> {
        (**self).open(path)
    }

    fn claim_exclusive(&mut self) -> Result<(), InputError> {
        (**self).claim_exclusive()
    }

    fn poll_ready(&mut self, timeout: Duration) -> Result<bool, InputError> {
        (**self).poll_ready(timeout)
    }

    fn read_one(&mut self) -> Result<RawEvent, InputError> {
        (**self).read_one()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
