//! 控制器状态
//!
//! 所有可变状态集中在一个 [`ControllerState`] 中，由主循环独占持有，
//! 以 `&mut` 传给解码器。

use crate::queue::CommandQueue;
use jogdial_protocol::{ActiveAxis, SpeedLevel};
use std::time::Instant;

/// 内圈状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JogState {
    /// 上一次的 8 位计数值；`None` 表示启动后尚未收到过内圈事件
    pub last: Option<u8>,
}

/// 外圈状态
#[derive(Debug, Clone, Copy, Default)]
pub struct ShuttleState {
    /// 最近一次上报值（-7..=7）
    pub last_value: Option<i32>,
    /// 最近一次上报时间
    pub last_report: Option<Instant>,
    /// 外圈回中时设备可能不上报 0，需要在下一次内圈事件时补发
    pub synthetic_zero_expected: bool,
}

/// 最近一次连续运动命令
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingCommand {
    pub command: Option<String>,
    /// 每周期重发
    pub continuous: bool,
}

/// 连接状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub device_connected: bool,
    pub transport_connected: bool,
    pub reconnect_requested: bool,
}

impl ConnectionState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 控制器全部状态
///
/// 内圈/外圈/待重发命令在整个进程生命周期内保留；
/// 连接状态与队列在每次重连时复位。
#[derive(Debug, Clone)]
pub struct ControllerState {
    pub axis: ActiveAxis,
    pub speed: SpeedLevel,
    pub jog: JogState,
    pub shuttle: ShuttleState,
    pub pending: PendingCommand,
    pub queue: CommandQueue,
    pub connection: ConnectionState,
}

impl ControllerState {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            axis: ActiveAxis::default(),
            speed: SpeedLevel::default(),
            jog: JogState::default(),
            shuttle: ShuttleState::default(),
            pending: PendingCommand::default(),
            queue: CommandQueue::new(queue_capacity),
            connection: ConnectionState::default(),
        }
    }

    /// 停止连续重发并清空队列
    pub fn cancel_motion(&mut self) {
        self.queue.clear();
        self.pending.continuous = false;
    }

    /// 重连前复位：队列、连续重发、连接标志
    pub fn reset_for_reconnect(&mut self) {
        self.cancel_motion();
        self.connection.reset();
    }
}
