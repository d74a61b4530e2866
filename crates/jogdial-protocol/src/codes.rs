//! 事件编码定义
//!
//! 集中定义设备上报的类型/编码常量，避免在解码逻辑中散落"魔法数"。

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::axis::ActiveAxis;

/// 事件类型（`input_event.type`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum EventType {
    /// 同步事件（一组事件结束）
    Done = 0,
    /// 按键
    Key = 1,
    /// 飞梭内圈 / 外圈
    JogShuttle = 2,
    /// 按键保持状态（忽略）
    ActiveKey = 4,
}

/// 按键编码（`type == Key` 时的 `code`）
///
/// 只列出被映射的按键，其他按键编码会被记录并忽略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum KeyCode {
    XAxis = 260,
    YAxis = 261,
    ZAxis = 262,
    AAxis = 263,
    /// 步进档位循环按键
    Increment = 264,
}

impl KeyCode {
    /// 轴选择按键对应的轴；非轴选择按键返回 `None`
    pub fn axis(self) -> Option<ActiveAxis> {
        match self {
            KeyCode::XAxis => Some(ActiveAxis::X),
            KeyCode::YAxis => Some(ActiveAxis::Y),
            KeyCode::ZAxis => Some(ActiveAxis::Z),
            KeyCode::AAxis => Some(ActiveAxis::A),
            KeyCode::Increment => None,
        }
    }
}

/// 按键按下
pub const KEY_PRESSED: i32 = 1;

/// 旋钮编码（`type == JogShuttle` 时的 `code`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum JogShuttleCode {
    /// 内圈：8 位回绕计数器
    Jog = 7,
    /// 外圈：自回中，取值 -7..=7
    Shuttle = 8,
}

/// 外圈最大偏转
pub const SHUTTLE_MAX: i32 = 7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_codes() {
        assert_eq!(KeyCode::try_from(260u16), Ok(KeyCode::XAxis));
        assert_eq!(KeyCode::try_from(264u16), Ok(KeyCode::Increment));
        assert!(KeyCode::try_from(259u16).is_err());
        assert!(KeyCode::try_from(265u16).is_err());
    }

    #[test]
    fn test_axis_mapping_is_one_to_one() {
        let axes: Vec<_> = [KeyCode::XAxis, KeyCode::YAxis, KeyCode::ZAxis, KeyCode::AAxis]
            .iter()
            .map(|k| k.axis().unwrap())
            .collect();
        assert_eq!(axes, ActiveAxis::ALL);
        assert_eq!(KeyCode::Increment.axis(), None);
    }

    #[test]
    fn test_jog_shuttle_codes() {
        assert_eq!(JogShuttleCode::try_from(7u16), Ok(JogShuttleCode::Jog));
        assert_eq!(JogShuttleCode::try_from(8u16), Ok(JogShuttleCode::Shuttle));
        assert!(JogShuttleCode::try_from(9u16).is_err());
    }
}
