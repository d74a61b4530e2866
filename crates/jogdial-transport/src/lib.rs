//! # Jogdial Transport Layer
//!
//! 命令接收端（Command Sink）抽象：把一批有序的命令字符串交给后端，
//! 返回被接收的前缀长度。
//!
//! - [`BusSink`]: 持久连接的消息总线（WebSocket 文本帧，一条命令一帧）
//! - [`HttpSink`]: 无连接 HTTP，每条命令本身就是一个 GET URL
//! - `MockSink`: 测试用（`mock` feature）

use thiserror::Error;

pub mod bus;
pub mod http;

pub use bus::BusSink;
pub use http::HttpSink;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockSink, MockSinkHandle};

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to connect to {endpoint}: {message}")]
    Connect { endpoint: String, message: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

/// 命令接收端
///
/// `submit` 按顺序发送命令，遇到第一条失败即停止，
/// 返回值是成功发送的条数；小于提交条数表示传输故障。
pub trait CommandSink {
    /// 建立连接（无连接传输直接返回 `Ok`）
    fn connect(&mut self) -> Result<(), TransportError>;

    /// 发送一批有序命令，返回被接收的前缀长度
    fn submit(&mut self, commands: &[String]) -> usize;

    /// 断开连接（幂等）
    fn disconnect(&mut self) {}

    /// 人类可读的端点描述（用于日志）
    fn endpoint(&self) -> String;
}

impl<T: CommandSink + ?Sized> CommandSink for Box<T> {
    fn connect(&mut self) -> Result<(), TransportError> {
        (**self).connect()
    }

    fn submit(&mut self, commands: &[String]) -> usize {
        (**self).submit(commands)
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn endpoint(&self) -> String {
        (**self).endpoint()
    }
}
