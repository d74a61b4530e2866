//! 运动命令合成
//!
//! 把"在某轴上移动多少、以多快速度"格式化为后端方言的命令字符串。
//! 纯格式化，不触碰队列；方言不支持的命令返回 `Ok(None)`。
//!
//! | 命令 | 消息总线 | HTTP |
//! |------|----------|------|
//! | 点动 | `send <dev> G91 G0 X0.010\nG90\n` | `http://h:p/send?gcode=G91G0X0.010%0DG90` |
//! | 连续 | `send <dev> G91 G1 F150.000 X0.265\nG90\n` | `…G91G1F150.000X0.265%0DG90` |
//! | 控制 | `send <dev> !\n` | 无 |
//! | 广播 | `broadcast {"id":"…","action":"x"}\n` | 无 |

use crate::config::{BridgeConfig, Dialect};
use jogdial_protocol::ActiveAxis;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// 单条命令的最大字节数
pub const MAX_COMMAND_LEN: usize = 256;

/// 命令合成错误
#[derive(Error, Debug)]
pub enum SynthError {
    /// 命令超长（配置中的主机名或设备路径过长）
    #[error("Command too long: {len} bytes (max {max})")]
    CommandTooLong { len: usize, max: usize },

    #[error("Failed to encode broadcast payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// 机床控制字符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// 进给保持
    FeedHold,
    /// 恢复运行
    Resume,
    /// 软复位（Ctrl-X）
    SoftReset,
}

impl ControlCommand {
    pub fn as_char(self) -> char {
        match self {
            ControlCommand::FeedHold => '!',
            ControlCommand::Resume => '~',
            ControlCommand::SoftReset => '\x18',
        }
    }
}

#[derive(Serialize)]
struct Broadcast<'a> {
    id: &'a str,
    action: &'a str,
}

/// 运动命令合成器
#[derive(Debug, Clone)]
pub struct MotionSynthesizer {
    dialect: Dialect,
    /// HTTP 方言的 URL 前缀（`http://host:port`）
    base_url: String,
    /// 消息总线方言的机床串口路径
    backend_device: String,
    device_id: String,
}

impl MotionSynthesizer {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            dialect: config.dialect,
            base_url: format!("http://{}:{}", config.host, config.port),
            backend_device: config.backend_device.clone(),
            device_id: config.device_id.clone(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// 单步点动（G0 相对移动）
    pub fn jog_step(
        &self,
        axis: ActiveAxis,
        distance: f64,
    ) -> Result<Option<String>, SynthError> {
        let axis = axis.letter();
        let command = match self.dialect {
            Dialect::Bus => format!(
                "send {} G91 G0 {}{:.3}\nG90\n",
                self.backend_device, axis, distance
            ),
            Dialect::Http => format!(
                "{}/send?gcode=G91G0{}{:.3}%0DG90",
                self.base_url, axis, distance
            ),
        };
        checked(command).map(Some)
    }

    /// 连续运动（G1 带进给速度的相对移动）
    pub fn shuttle_move(
        &self,
        axis: ActiveAxis,
        feed: f64,
        distance: f64,
    ) -> Result<Option<String>, SynthError> {
        let axis = axis.letter();
        let command = match self.dialect {
            Dialect::Bus => format!(
                "send {} G91 G1 F{:.3} {}{:.3}\nG90\n",
                self.backend_device, feed, axis, distance
            ),
            Dialect::Http => format!(
                "{}/send?gcode=G91G1F{:.3}{}{:.3}%0DG90",
                self.base_url, feed, axis, distance
            ),
        };
        checked(command).map(Some)
    }

    /// 控制字符
    pub fn control(&self, control: ControlCommand) -> Result<Option<String>, SynthError> {
        match self.dialect {
            Dialect::Bus => {
                checked(format!("send {} {}\n", self.backend_device, control.as_char())).map(Some)
            },
            Dialect::Http => Ok(None),
        }
    }

    /// TinyG 系列固件的停止并清空规划缓冲命令
    pub fn firmware_stop(&self) -> Result<Option<String>, SynthError> {
        match self.dialect {
            Dialect::Bus => checked(format!("send {} !%\n", self.backend_device)).map(Some),
            Dialect::Http => Ok(None),
        }
    }

    /// 广播当前轴（小写字母）
    pub fn broadcast_axis(&self, axis: ActiveAxis) -> Result<Option<String>, SynthError> {
        let action = axis.letter().to_ascii_lowercase().to_string();
        self.broadcast(&action)
    }

    /// 广播当前步进距离
    pub fn broadcast_increment(&self, distance: f64) -> Result<Option<String>, SynthError> {
        self.broadcast(&format!("{:.3}mm", distance))
    }

    fn broadcast(&self, action: &str) -> Result<Option<String>, SynthError> {
        if self.dialect != Dialect::Bus {
            return Ok(None);
        }
        let payload = serde_json::to_string(&Broadcast {
            id: &self.device_id,
            action,
        })?;
        checked(format!("broadcast {}\n", payload)).map(Some)
    }
}

fn checked(command: String) -> Result<String, SynthError> {
    if command.len() > MAX_COMMAND_LEN {
        return Err(SynthError::CommandTooLong {
            len: command.len(),
            max: MAX_COMMAND_LEN,
        });
    }
    debug!("synthesized {:?}", command);
    Ok(command)
}
