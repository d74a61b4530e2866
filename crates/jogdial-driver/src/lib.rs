//! # Jogdial Driver
//!
//! 拨盘事件到 CNC 后端命令的桥接核心：
//! - 事件解码（轴选择、档位、内圈点动、外圈连续运动）
//! - 运动命令合成（消息总线 / HTTP 两种方言）
//! - 有界命令队列（离散与连续命令互斥）
//! - 连接管理主循环（后端连接、设备独占、固定周期轮询、故障重连）
//!
//! # 使用示例
//!
//! ```no_run
//! use jogdial_driver::{BridgeBuilder, BridgeConfig};
//!
//! let config = BridgeConfig::default();
//! let mut bridge = BridgeBuilder::new("/dev/input/by-id/usb-Contour_Design_ShuttleXpress-event-if00")
//!     .config(config)
//!     .build_default()
//!     .unwrap();
//! bridge.run().unwrap();
//! ```

pub mod auxiliary;
pub mod bridge;
mod builder;
pub mod config;
pub mod decoder;
mod error;
pub mod motion;
pub mod queue;
pub mod state;

pub use auxiliary::{
    AuxEvent, AuxInput, IndicatorStatus, LogIndicator, NoAux, NoIndicator, StatusIndicator,
};
pub use bridge::{Bridge, BridgeState, ReconnectHandle};
pub use builder::{BridgeBuilder, backend_sink};
pub use config::{BridgeConfig, ConfigError, Dialect, ShuttlePolicy};
pub use decoder::{EventDecoder, shuttle_motion};
pub use error::DriverError;
pub use motion::{ControlCommand, MAX_COMMAND_LEN, MotionSynthesizer, SynthError};
pub use queue::{CommandClass, CommandQueue, FlushOutcome, QueueError};
pub use state::{ConnectionState, ControllerState, JogState, PendingCommand, ShuttleState};
