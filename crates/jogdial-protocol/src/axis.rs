//! 当前轴与步进档位

use std::fmt;

/// 当前激活的运动轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActiveAxis {
    #[default]
    X,
    Y,
    Z,
    A,
}

impl ActiveAxis {
    /// 全部轴（按键编码顺序）
    pub const ALL: [ActiveAxis; 4] = [ActiveAxis::X, ActiveAxis::Y, ActiveAxis::Z, ActiveAxis::A];

    /// G-code 轴字母（大写）
    pub fn letter(self) -> char {
        match self {
            ActiveAxis::X => 'X',
            ActiveAxis::Y => 'Y',
            ActiveAxis::Z => 'Z',
            ActiveAxis::A => 'A',
        }
    }
}

impl fmt::Display for ActiveAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// 步进档位（0..=3）
///
/// 每按一次档位键 +1 并对 4 取模，对应配置中升序排列的四个步进距离。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpeedLevel {
    L1 = 0,
    L2 = 1,
    L3 = 2,
    L4 = 3,
}

impl SpeedLevel {
    /// 档位数量
    pub const COUNT: usize = 4;

    /// 下一个档位（循环）
    pub fn next(self) -> Self {
        match self {
            SpeedLevel::L1 => SpeedLevel::L2,
            SpeedLevel::L2 => SpeedLevel::L3,
            SpeedLevel::L3 => SpeedLevel::L4,
            SpeedLevel::L4 => SpeedLevel::L1,
        }
    }

    /// 档位下标，用于索引步进距离表
    pub fn index(self) -> usize {
        self as usize
    }
}

impl Default for SpeedLevel {
    /// 启动时使用最大档位
    fn default() -> Self {
        SpeedLevel::L4
    }
}

impl fmt::Display for SpeedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.index() + 1)
    }
}
