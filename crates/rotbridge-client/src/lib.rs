//! # rotbridge Client
//!
//! Hamlib rotctld 客户端：会话管理、位置查询、设置指向以及带确认的阻塞运动。
//!
//! # 使用场景
//!
//! - 桥接程序：持续把外部指向转发给转台（阻塞模式，逐次确认到达）
//! - 命令行诊断：查询位置、单次设置指向、停止
//!
//! # 模块
//!
//! - [`rotator`]: [`RotatorClient`] 会话
//! - [`motion`]: 运动确认状态机 [`MoveAndConfirm`]
//! - [`clock`]: 可注入时钟（[`SystemClock`] / [`SimulatedClock`]）

pub mod clock;
pub mod config;
pub mod error;
pub mod motion;
pub mod rotator;
pub mod types;

// 重新导出常用类型
pub use clock::{Clock, SimulatedClock, SystemClock};
pub use config::SessionConfig;
pub use error::{Result, RotatorError};
pub use motion::{MoveAndConfirm, MoveState, RotatorIo};
pub use rotator::RotatorClient;
pub use types::{CommandResult, MoveMode, MoveOutcome};

pub use rotbridge_protocol::Position;
