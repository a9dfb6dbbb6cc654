//! 命令结果与运动结果类型

use crate::error::RotatorError;
use rotbridge_protocol::{HamlibStatus, Position, ProtocolError};
use std::fmt;
use std::time::Duration;

/// 单条设置类命令的应答分类
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandResult {
    /// 应答包含 `RPRT 0`
    Ack,
    /// 收到应答但不含 `RPRT 0`（保留原始文本）
    ProtocolError(String),
    /// 等待应答超时
    Timeout,
    /// 连接中断
    ConnectionLost,
}

impl CommandResult {
    /// 将原始应答分类
    pub fn from_response(response: &str) -> Self {
        if rotbridge_protocol::is_ack(response) {
            CommandResult::Ack
        } else {
            CommandResult::ProtocolError(response.to_string())
        }
    }

    /// 将交换失败分类（超时 / 其余视为连接中断）
    pub fn from_error(error: &RotatorError) -> Self {
        match error {
            RotatorError::Timeout => CommandResult::Timeout,
            _ => CommandResult::ConnectionLost,
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, CommandResult::Ack)
    }

    /// 应答中的 Hamlib 状态（仅 `ProtocolError` 且可解析时）
    pub fn hamlib_status(&self) -> Option<HamlibStatus> {
        match self {
            CommandResult::ProtocolError(raw) => HamlibStatus::find_in(raw),
            _ => None,
        }
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::Ack => write!(f, "acknowledged"),
            CommandResult::ProtocolError(raw) => write!(f, "protocol error ({:?})", raw.trim()),
            CommandResult::Timeout => write!(f, "timeout"),
            CommandResult::ConnectionLost => write!(f, "connection lost"),
        }
    }
}

/// 设置指向的执行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MoveMode {
    /// 收到确认即返回
    #[default]
    NonBlocking,
    /// 等待到达目标（或失败）
    Blocking,
}

impl MoveMode {
    pub fn from_blocking(blocking: bool) -> Self {
        if blocking {
            MoveMode::Blocking
        } else {
            MoveMode::NonBlocking
        }
    }
}

/// `command_position` 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// 非阻塞模式：命令已被接受
    Accepted,
    /// 目标含 NaN / 无穷大，未发送任何命令
    InvalidTarget(ProtocolError),
    /// 阻塞模式：已到达目标（容差内），携带最后一次回报位置
    Arrived(Position),
    /// 命令未被接受
    CommandRejected(CommandResult),
    /// 轮询位置失败
    NoTelemetry,
    /// 超时前未到达
    MovementTimeout {
        /// 最后一次回报位置
        last: Option<Position>,
        /// 运动超时设置
        timeout: Duration,
    },
}

impl MoveOutcome {
    /// 是否成功（已接受或已到达）
    pub fn is_success(&self) -> bool {
        matches!(self, MoveOutcome::Accepted | MoveOutcome::Arrived(_))
    }

    /// 将失败结果升级为错误
    ///
    /// 成功时返回到达位置（非阻塞模式为 `None`）。
    pub fn into_result(self) -> Result<Option<Position>, RotatorError> {
        match self {
            MoveOutcome::Accepted => Ok(None),
            MoveOutcome::Arrived(position) => Ok(Some(position)),
            MoveOutcome::InvalidTarget(e) => Err(RotatorError::InvalidTarget(e)),
            MoveOutcome::CommandRejected(result) => Err(RotatorError::MovementRejected(result)),
            MoveOutcome::NoTelemetry => Err(RotatorError::TelemetryLost),
            MoveOutcome::MovementTimeout { timeout, .. } => Err(RotatorError::MovementTimeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}
