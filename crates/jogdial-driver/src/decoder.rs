//! 事件解码
//!
//! 把设备原始事件翻译为轴选择、档位切换、点动步进和外圈连续运动，
//! 经 [`MotionSynthesizer`] 格式化后写入命令队列。
//!
//! 设备的几个怪癖在这里处理：
//! - 内圈是 8 位回绕计数器，方向由回绕差值的符号决定
//! - 启动后第一个内圈样本只用来建立基准
//! - 外圈回中时设备经常不上报 0，而是紧接着上报一个内圈事件；
//!   因此在内圈事件中检查外圈是否已经"安静"了一段时间，补发一次回中

use crate::config::{BridgeConfig, ShuttlePolicy};
use crate::error::DriverError;
use crate::motion::{ControlCommand, MotionSynthesizer};
use crate::queue::CommandClass;
use crate::state::ControllerState;
use jogdial_protocol::{
    EventType, JogShuttleCode, KEY_PRESSED, KeyCode, RawEvent, SHUTTLE_MAX, SpeedLevel,
};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// 外圈连续运动的进给速度与单周期距离
///
/// - `feed = increment × |value| × (max_feed / (7 × max_increment))`
/// - `distance = (feed / 60) × (cycle × overshoot) × sign(value)`
///
/// 满偏转且处于最大档位时 `feed == max_feed`。
pub fn shuttle_motion(
    increment: f64,
    max_increment: f64,
    value: i32,
    max_feed: f64,
    cycle: Duration,
    overshoot: f64,
) -> (f64, f64) {
    let direction = if value >= 0 { 1.0 } else { -1.0 };
    let feed = increment
        * direction
        * f64::from(value)
        * (max_feed / (f64::from(SHUTTLE_MAX) * max_increment));
    let distance = (feed / 60.0) * (cycle.as_secs_f64() * overshoot) * direction;
    (feed, distance)
}

/// 事件解码器
#[derive(Debug, Clone)]
pub struct EventDecoder {
    synth: MotionSynthesizer,
    increments: [f64; SpeedLevel::COUNT],
    max_feed: f64,
    cycle: Duration,
    overshoot: f64,
    synthetic_zero_delay: Duration,
    alternate_firmware: bool,
    policy: ShuttlePolicy,
}

impl EventDecoder {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            synth: MotionSynthesizer::new(config),
            increments: config.increments,
            max_feed: config.max_feed,
            cycle: config.cycle_period(),
            overshoot: config.overshoot,
            synthetic_zero_delay: config.synthetic_zero_delay(),
            alternate_firmware: config.alternate_firmware,
            policy: config.shuttle,
        }
    }

    fn increment(&self, level: SpeedLevel) -> f64 {
        self.increments[level.index()]
    }

    /// 处理一条原始事件
    ///
    /// 无法识别的事件记录日志后忽略；只有合成/入队失败（逻辑缺陷）会返回错误。
    pub fn handle_event(
        &self,
        state: &mut ControllerState,
        event: RawEvent,
        now: Instant,
    ) -> Result<(), DriverError> {
        match event.event_type() {
            Ok(EventType::Done) | Ok(EventType::ActiveKey) => Ok(()),
            Ok(EventType::Key) => self.key(state, event.code, event.value),
            Ok(EventType::JogShuttle) => match JogShuttleCode::try_from(event.code) {
                Ok(JogShuttleCode::Jog) => self.jog(state, event.value, now),
                Ok(JogShuttleCode::Shuttle) => self.shuttle(state, event.value, now),
                Err(_) => {
                    warn!(
                        "Ignoring jog/shuttle event with unknown code {} (value {})",
                        event.code, event.value
                    );
                    Ok(())
                },
            },
            Err(e) => {
                warn!("Ignoring event: {}", e);
                Ok(())
            },
        }
    }

    /// 按键事件（只处理按下）
    pub fn key(
        &self,
        state: &mut ControllerState,
        code: u16,
        value: i32,
    ) -> Result<(), DriverError> {
        if value != KEY_PRESSED {
            trace!("key {} value {} ignored", code, value);
            return Ok(());
        }

        let key = match KeyCode::try_from(code) {
            Ok(key) => key,
            Err(_) => {
                warn!("Ignoring unmapped key {}", code);
                return Ok(());
            },
        };

        let broadcast = match key.axis() {
            Some(axis) => {
                state.axis = axis;
                debug!("Active axis: {}", axis);
                self.synth.broadcast_axis(axis)?
            },
            None => {
                state.speed = state.speed.next();
                let increment = self.increment(state.speed);
                debug!("Speed level: {} ({:.3})", state.speed, increment);
                self.synth.broadcast_increment(increment)?
            },
        };

        // 广播抢占所有尚未发出的运动
        state.cancel_motion();
        if let Some(command) = broadcast {
            state.queue.push(CommandClass::Discrete, command)?;
        }
        Ok(())
    }

    /// 内圈事件
    ///
    /// 每个计数单位产生一条单步命令，不合并为一次多单位移动。
    pub fn jog(
        &self,
        state: &mut ControllerState,
        value: i32,
        now: Instant,
    ) -> Result<(), DriverError> {
        let Ok(sample) = u8::try_from(value) else {
            warn!("Ignoring jog value {} (expected 0..=255)", value);
            return Ok(());
        };

        if let Some(previous) = state.jog.last {
            let delta = sample.wrapping_sub(previous) as i8;
            if delta != 0 {
                let step: i8 = delta.signum();
                let distance = self.increment(state.speed) * f64::from(step);
                trace!("jog {} -> {} ({} steps)", previous, sample, delta);

                // 一个周期内的步进不超过队列剩余容量，多余的丢弃
                let steps = usize::from(delta.unsigned_abs());
                let room = state.queue.room_for(CommandClass::Discrete);
                if steps > room {
                    warn!(
                        "Command queue full, dropping {} of {} jog steps",
                        steps - room,
                        steps
                    );
                }

                for _ in 0..steps.min(room) {
                    if let Some(command) = self.synth.jog_step(state.axis, distance)? {
                        state.queue.push(CommandClass::Discrete, command)?;
                    }
                }
            }
        }
        state.jog.last = Some(sample);

        if state.shuttle.synthetic_zero_expected {
            let quiet_for = state
                .shuttle
                .last_report
                .map(|t| now.saturating_duration_since(t))
                .unwrap_or(Duration::MAX);
            if quiet_for > self.synthetic_zero_delay {
                state.shuttle.synthetic_zero_expected = false;
                if state.shuttle.last_value != Some(0) {
                    debug!("Shuttle silent for {:?}, assuming centered", quiet_for);
                    self.shuttle(state, 0, now)?;
                    state.shuttle.synthetic_zero_expected = false;
                }
            }
        }
        Ok(())
    }

    /// 外圈事件
    pub fn shuttle(
        &self,
        state: &mut ControllerState,
        value: i32,
        now: Instant,
    ) -> Result<(), DriverError> {
        if !(-SHUTTLE_MAX..=SHUTTLE_MAX).contains(&value) {
            warn!("Ignoring shuttle value {} (expected -7..=7)", value);
            return Ok(());
        }

        state.shuttle.last_report = Some(now);
        state.shuttle.last_value = Some(value);
        state.shuttle.synthetic_zero_expected = true;

        // 外圈运动期间不积压任何命令
        state.queue.clear();

        let stop = value == 0 || (self.policy.stop_on_unit_deflection && value.abs() == 1);
        if stop {
            state.pending.continuous = false;
            if self.alternate_firmware
                && let Some(command) = self.synth.firmware_stop()?
            {
                state.queue.push(CommandClass::Discrete, command)?;
            }
            return Ok(());
        }

        let (feed, distance) = shuttle_motion(
            self.increment(state.speed),
            self.increment(SpeedLevel::L4),
            value,
            self.max_feed,
            self.cycle,
            self.overshoot,
        );
        if let Some(command) = self.synth.shuttle_move(state.axis, feed, distance)? {
            state.pending.command = Some(command.clone());
            state.pending.continuous = true;
            state.queue.push(CommandClass::Continuous, command)?;
        }
        Ok(())
    }

    /// 控制命令（进给保持/恢复/软复位）
    ///
    /// 与广播一样先取消所有待发运动。
    pub fn control(
        &self,
        state: &mut ControllerState,
        control: ControlCommand,
    ) -> Result<(), DriverError> {
        state.cancel_motion();
        match self.synth.control(control)? {
            Some(command) => state.queue.push(CommandClass::Discrete, command)?,
            None => debug!("{:?} not supported by {:?} backend", control, self.synth.dialect()),
        }
        Ok(())
    }
}
