//! 辅助输入与状态指示
//!
//! 主循环每周期轮询一次 [`AuxInput`]（外部开关：进给保持、恢复、软复位、重连），
//! 并把状态快照交给 [`StatusIndicator`]（指示灯等）。
//!
//! 两个 trait 都在主循环线程内同步调用，实现必须立即返回。

use crate::state::ControllerState;
use jogdial_protocol::{ActiveAxis, SpeedLevel};
use std::sync::mpsc::{Receiver, TryRecvError};
use tracing::info;

/// 辅助输入事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxEvent {
    FeedHold,
    Resume,
    SoftReset,
    /// 请求断开并重新建立设备与后端连接
    Reconnect,
}

/// 辅助输入
pub trait AuxInput {
    /// 取出一个待处理事件；没有则返回 `None`
    fn poll(&mut self) -> Option<AuxEvent>;
}

/// 无辅助输入
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAux;

impl AuxInput for NoAux {
    fn poll(&mut self) -> Option<AuxEvent> {
        None
    }
}

/// 其他线程（如 GPIO 监视线程）通过 channel 投递事件
impl AuxInput for Receiver<AuxEvent> {
    fn poll(&mut self) -> Option<AuxEvent> {
        match self.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl<T: AuxInput + ?Sized> AuxInput for Box<T> {
    fn poll(&mut self) -> Option<AuxEvent> {
        (**self).poll()
    }
}

/// 指示器状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorStatus {
    pub device_connected: bool,
    pub transport_connected: bool,
    pub axis: ActiveAxis,
    pub speed: SpeedLevel,
}

impl IndicatorStatus {
    pub fn from_state(state: &ControllerState) -> Self {
        Self {
            device_connected: state.connection.device_connected,
            transport_connected: state.connection.transport_connected,
            axis: state.axis,
            speed: state.speed,
        }
    }
}

/// 状态指示器
pub trait StatusIndicator {
    fn update(&mut self, status: &IndicatorStatus);
}

/// 无指示器
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIndicator;

impl StatusIndicator for NoIndicator {
    fn update(&mut self, _status: &IndicatorStatus) {}
}

/// 以日志代替指示灯：状态变化时输出一行
#[derive(Debug, Clone, Default)]
pub struct LogIndicator {
    last: Option<IndicatorStatus>,
}

impl LogIndicator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusIndicator for LogIndicator {
    fn update(&mut self, status: &IndicatorStatus) {
        if self.last.as_ref() == Some(status) {
            return;
        }
        info!(
            "status: device={} backend={} axis={} level={}",
            if status.device_connected { "up" } else { "down" },
            if status.transport_connected { "up" } else { "down" },
            status.axis,
            status.speed
        );
        self.last = Some(*status);
    }
}

impl<T: StatusIndicator + ?Sized> StatusIndicator for Box<T> {
    fn update(&mut self, status: &IndicatorStatus) {
        (**self).update(status)
    }
}
