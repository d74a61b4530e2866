//! 连接管理主循环
//!
//! 状态机：
//!
//! ```text
//! TransportConnecting ──ok──▶ DeviceConnecting ──ok──▶ Running
//!        ▲  │fail(sleep)            │fail(sleep)           │ 读错误 / 发送不足 / 重连请求
//!        │  └──────┘                └──────┘               ▼
//!        └──────────────────────────────────────────── Reconnecting
//! ```
//!
//! 单线程、固定周期轮询。`tick()` 每次只推进一步（一次连接尝试或一个运行周期），
//! `run()` 就是 `loop { tick()? }`。

use crate::auxiliary::{AuxEvent, AuxInput, IndicatorStatus, NoAux, NoIndicator, StatusIndicator};
use crate::config::BridgeConfig;
use crate::decoder::EventDecoder;
use crate::error::DriverError;
use crate::motion::ControlCommand;
use crate::queue::CommandClass;
use crate::state::ControllerState;
use jogdial_input::{InputError, InputSource};
use jogdial_transport::CommandSink;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 主循环所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// 正在连接后端
    TransportConnecting,
    /// 正在打开并独占输入设备
    DeviceConnecting,
    /// 正常运行
    Running,
    /// 释放资源，准备重新连接
    Reconnecting,
}

/// 外部重连请求句柄
///
/// 可跨线程克隆；请求在后端重新连接成功时被清除。
#[derive(Debug, Clone, Default)]
pub struct ReconnectHandle {
    requested: Arc<AtomicBool>,
}

impl ReconnectHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求重连
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    fn clear(&self) {
        self.requested.store(false, Ordering::Release);
    }
}

/// 拨盘到后端的桥接
pub struct Bridge<I, S> {
    config: BridgeConfig,
    device_path: PathBuf,
    input: I,
    sink: S,
    aux: Box<dyn AuxInput + Send>,
    indicator: Box<dyn StatusIndicator + Send>,
    decoder: EventDecoder,
    state: ControllerState,
    phase: BridgeState,
    reconnect: ReconnectHandle,
}

impl<I: InputSource, S: CommandSink> Bridge<I, S> {
    /// 创建桥接（配置必须已通过校验，推荐使用 [`BridgeBuilder`](crate::BridgeBuilder)）
    pub fn new(config: BridgeConfig, device_path: impl Into<PathBuf>, input: I, sink: S) -> Self {
        Self {
            decoder: EventDecoder::new(&config),
            state: ControllerState::new(config.queue_capacity),
            device_path: device_path.into(),
            input,
            sink,
            aux: Box::new(NoAux),
            indicator: Box::new(NoIndicator),
            phase: BridgeState::TransportConnecting,
            reconnect: ReconnectHandle::new(),
            config,
        }
    }

    pub(crate) fn set_aux_input(&mut self, aux: Box<dyn AuxInput + Send>) {
        self.aux = aux;
    }

    pub(crate) fn set_indicator(&mut self, indicator: Box<dyn StatusIndicator + Send>) {
        self.indicator = indicator;
    }

    pub fn phase(&self) -> BridgeState {
        self.phase
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// 获取重连句柄（可交给其他线程）
    pub fn reconnect_handle(&self) -> ReconnectHandle {
        self.reconnect.clone()
    }

    /// 持续运行，只在逻辑缺陷时返回错误
    pub fn run(&mut self) -> Result<(), DriverError> {
        #[cfg(feature = "realtime")]
        {
            use thread_priority::*;

            match set_current_thread_priority(ThreadPriority::Max) {
                Ok(_) => {
                    info!("Bridge thread priority set to MAX (realtime)");
                },
                Err(e) => {
                    warn!(
                        "Failed to set bridge thread priority: {}. \
                        On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                        e
                    );
                },
            }
        }

        info!(
            "Bridging '{}' to {} ({:?}, cycle {:?})",
            self.device_path.display(),
            self.sink.endpoint(),
            self.config.dialect,
            self.config.cycle_period()
        );

        loop {
            self.tick()?;
        }
    }

    /// 推进一步，返回新的阶段
    pub fn tick(&mut self) -> Result<BridgeState, DriverError> {
        self.phase = match self.phase {
            BridgeState::TransportConnecting => self.connect_transport(),
            BridgeState::DeviceConnecting => self.connect_device(),
            BridgeState::Running => self.run_cycle()?,
            BridgeState::Reconnecting => {
                self.reset_connections();
                BridgeState::TransportConnecting
            },
        };
        Ok(self.phase)
    }

    fn connect_transport(&mut self) -> BridgeState {
        match self.sink.connect() {
            Ok(()) => {
                info!("Backend connected: {}", self.sink.endpoint());
                self.state.connection.transport_connected = true;
                self.state.connection.reconnect_requested = false;
                self.reconnect.clear();
                self.update_indicator();
                BridgeState::DeviceConnecting
            },
            Err(e) => {
                warn!(
                    "Backend connection failed: {}. Retrying in {:?}",
                    e,
                    self.config.transport_retry()
                );
                spin_sleep::sleep(self.config.transport_retry());
                BridgeState::TransportConnecting
            },
        }
    }

    fn connect_device(&mut self) -> BridgeState {
        match self.open_device() {
            Ok(()) => {
                info!("Input device ready: '{}'", self.device_path.display());
                self.state.connection.device_connected = true;
                self.update_indicator();
                BridgeState::Running
            },
            Err(e) => {
                warn!(
                    "Input device '{}' unavailable: {}. Retrying in {:?}",
                    self.device_path.display(),
                    e,
                    self.config.device_retry()
                );
                self.input.close();
                spin_sleep::sleep(self.config.device_retry());
                BridgeState::DeviceConnecting
            },
        }
    }

    fn open_device(&mut self) -> Result<(), InputError> {
        self.input.open(&self.device_path)?;
        self.input.claim_exclusive()
    }

    /// 一个运行周期
    fn run_cycle(&mut self) -> Result<BridgeState, DriverError> {
        let cycle_start = Instant::now();

        // 1. 排空设备上已就绪的全部事件
        if let Some(e) = self.drain_input()? {
            warn!("Input device error: {}. Reconnecting", e);
            return Ok(BridgeState::Reconnecting);
        }

        // 2. 辅助输入
        while let Some(event) = self.aux.poll() {
            debug!("Aux input: {:?}", event);
            let control = match event {
                AuxEvent::FeedHold => ControlCommand::FeedHold,
                AuxEvent::Resume => ControlCommand::Resume,
                AuxEvent::SoftReset => ControlCommand::SoftReset,
                AuxEvent::Reconnect => {
                    self.reconnect.request();
                    continue;
                },
            };
            self.decoder.control(&mut self.state, control)?;
        }

        if self.reconnect.is_requested() {
            info!("Reconnect requested");
            self.state.connection.reconnect_requested = true;
            return Ok(BridgeState::Reconnecting);
        }

        // 3. 发送队列
        let outcome = self.state.queue.flush(&mut self.sink);
        if outcome.is_shortfall() {
            warn!(
                "Backend accepted {}/{} commands. Reconnecting",
                outcome.accepted, outcome.submitted
            );
            self.state.connection.transport_connected = false;
            return Ok(BridgeState::Reconnecting);
        }

        // 4. 外圈保持偏转时每周期重发
        if self.state.pending.continuous
            && self.state.connection.transport_connected
            && let Some(command) = self.state.pending.command.clone()
        {
            self.state.queue.push(CommandClass::Continuous, command)?;
        }

        // 5. 指示器
        self.update_indicator();

        // 6. 睡眠到周期结束
        let period = self.config.cycle_period();
        let elapsed = cycle_start.elapsed();
        if elapsed < period {
            spin_sleep::sleep(period - elapsed);
        } else {
            trace!("Cycle overrun: {:?} (period {:?})", elapsed, period);
        }

        Ok(BridgeState::Running)
    }

    /// 返回 `Ok(Some(_))` 表示设备故障，需要重连
    fn drain_input(&mut self) -> Result<Option<InputError>, DriverError> {
        loop {
            let event = match self.input.poll_ready(Duration::ZERO) {
                Ok(false) => return Ok(None),
                Ok(true) => match self.input.read_one() {
                    Ok(event) => event,
                    Err(e) => return Ok(Some(e)),
                },
                Err(e) => return Ok(Some(e)),
            };
            self.decoder.handle_event(&mut self.state, event, Instant::now())?;
        }
    }

    /// 释放设备与后端，复位队列和连接状态，等待一个设备重试间隔
    fn reset_connections(&mut self) {
        self.state.reset_for_reconnect();
        self.input.close();
        self.sink.disconnect();
        self.update_indicator();
        info!(
            "Connections released, reconnecting in {:?}",
            self.config.device_retry()
        );
        spin_sleep::sleep(self.config.device_retry());
    }

    fn update_indicator(&mut self) {
        self.indicator.update(&IndicatorStatus::from_state(&self.state));
    }
}
