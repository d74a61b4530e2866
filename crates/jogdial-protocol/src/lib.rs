//! # Jogdial Protocol
//!
//! 拨盘设备事件协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `codes`: 事件类型 / 按键 / 旋钮编码
//! - `axis`: 当前轴与步进档位模型
//!
//! ## 记录格式
//!
//! 设备通过 Linux input 子系统上报固定长度的 `struct input_event`：
//!
//! ```text
//! | timeval (2 × c_long) | type: u16 | code: u16 | value: i32 |
//! ```
//!
//! 时间戳部分被丢弃，只保留 `type/code/value` 三元组。字节序为本机字节序。

pub mod axis;
pub mod codes;

pub use axis::{ActiveAxis, SpeedLevel};
pub use codes::*;

use std::ffi::c_long;
use thiserror::Error;

/// `struct timeval` 的长度（`tv_sec` + `tv_usec`）
const TIMEVAL_SIZE: usize = 2 * std::mem::size_of::<c_long>();

/// 单条事件记录的字节长度
///
/// 64 位 Linux 上为 24 字节。
pub const EVENT_RECORD_SIZE: usize = TIMEVAL_SIZE + 8;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid record length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unknown event type: {0}")]
    UnknownEventType(u16),
}

/// 设备原始事件
///
/// 短生命周期：每读到一条立即交给解码器消费。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// 事件类型（原始值，见 [`EventType`]）
    pub kind: u16,
    /// 事件编码（按键编码或旋钮编码）
    pub code: u16,
    /// 事件值
    pub value: i32,
}

impl RawEvent {
    /// 直接构造事件
    pub const fn new(kind: u16, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }

    /// 按键事件（`value`: 1 按下，0 释放）
    pub fn key(code: KeyCode, value: i32) -> Self {
        Self::new(EventType::Key.into(), code.into(), value)
    }

    /// 飞梭内圈（jog）事件
    pub fn jog(value: i32) -> Self {
        Self::new(EventType::JogShuttle.into(), JogShuttleCode::Jog.into(), value)
    }

    /// 飞梭外圈（shuttle）事件
    pub fn shuttle(value: i32) -> Self {
        Self::new(EventType::JogShuttle.into(), JogShuttleCode::Shuttle.into(), value)
    }

    /// 从一条完整的 `input_event` 记录解析
    ///
    /// # 错误
    /// - `ProtocolError::InvalidLength`: 记录长度不是 [`EVENT_RECORD_SIZE`]
    pub fn from_record(record: &[u8]) -> Result<Self, ProtocolError> {
        if record.len() != EVENT_RECORD_SIZE {
            return Err(ProtocolError::InvalidLength {
                expected: EVENT_RECORD_SIZE,
                actual: record.len(),
            });
        }

        let tail = &record[TIMEVAL_SIZE..];
        Ok(Self {
            kind: u16::from_ne_bytes([tail[0], tail[1]]),
            code: u16::from_ne_bytes([tail[2], tail[3]]),
            value: i32::from_ne_bytes([tail[4], tail[5], tail[6], tail[7]]),
        })
    }

    /// 编码为 `input_event` 记录（时间戳置零）
    ///
    /// 主要用于模拟设备和测试。
    pub fn to_record(&self) -> [u8; EVENT_RECORD_SIZE] {
        let mut record = [0u8; EVENT_RECORD_SIZE];
        record[TIMEVAL_SIZE..TIMEVAL_SIZE + 2].copy_from_slice(&self.kind.to_ne_bytes());
        record[TIMEVAL_SIZE + 2..TIMEVAL_SIZE + 4].copy_from_slice(&self.code.to_ne_bytes());
        record[TIMEVAL_SIZE + 4..].copy_from_slice(&self.value.to_ne_bytes());
        record
    }

    /// 解析事件类型
    pub fn event_type(&self) -> Result<EventType, ProtocolError> {
        EventType::try_from(self.kind).map_err(|_| ProtocolError::UnknownEventType(self.kind))
    }
}
