//! 驱动层模块
//!
//! 本模块把 MacDoppler 广播接到 rotctld 会话上：
//! - 监听线程（UDP 广播接收与解析）
//! - 最新值中继（邮箱模式，合并阻塞运动期间的新目标）
//! - 控制循环（周期性取目标，阻塞运动，失败升级）
//!
//! ```text
//! PositionListener ──publish──▶ LatestValueRelay ──take_latest──▶ ControlLoop ──▶ RotatorClient
//! ```

pub mod bridge;
pub mod control_loop;
mod error;
pub mod listener;
pub mod metrics;
pub mod relay;

pub use bridge::Bridge;
pub use control_loop::{
    ControlLoop, ControlLoopConfig, ControlSummary, DryRunRotator, RotatorControl,
    ShutdownHandle, shutdown_channel,
};
pub use error::DriverError;
pub use listener::{ListenerConfig, PositionListener};
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use relay::{LatestValueRelay, RelayReceiver, RelaySender};
