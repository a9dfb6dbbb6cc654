//! 错误类型体系
//!
//! 区分会话级致命错误（连接失效、遥测丢失）与单次运动失败（被拒绝、超时）。
//!
//! # 示例
//!
//! ```rust
//! use rotbridge_client::RotatorError;
//!
//! fn handle_error(err: RotatorError) {
//!     if err.is_fatal() {
//!         eprintln!("致命错误: {}", err);
//!     } else if err.is_movement_failure() {
//!         eprintln!("运动失败: {}", err);
//!     }
//! }
//! ```

use crate::types::CommandResult;
use rotbridge_link::LinkError;
use rotbridge_protocol::ProtocolError;
use thiserror::Error;

/// 转台客户端错误类型
#[derive(Debug, Error)]
pub enum RotatorError {
    // ==================== 会话错误 ====================
    /// 连接建立后握手（`_`）未在超时内得到应答
    #[error("rotctld did not answer the identify handshake")]
    ConnectTimeout,

    /// 连接中断（读写失败、对端关闭、会话已关闭）
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// 读取应答超时
    #[error("Timed out waiting for rotctld response")]
    Timeout,

    /// 底层链路错误（解析地址、建立连接）
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// 会话参数无效
    #[error("Invalid parameter '{param}': {reason}")]
    InvalidConfig { param: &'static str, reason: String },

    // ==================== 协议错误 ====================
    /// 应答内容不符合预期
    #[error("Unexpected rotctld response: {response:?}")]
    ProtocolError { response: String },

    /// 应答无法解析
    #[error("Failed to parse rotctld response: {0}")]
    ParseFailure(#[from] ProtocolError),

    // ==================== 运动错误 ====================
    /// 目标无法构造（NaN / 无穷大），未发送命令
    #[error("Invalid target: {0}")]
    InvalidTarget(ProtocolError),

    /// 设置指向命令未被接受
    #[error("Movement command rejected: {0}")]
    MovementRejected(CommandResult),

    /// 超时前未到达目标
    #[error("Movement timeout after {timeout_ms}ms")]
    MovementTimeout { timeout_ms: u64 },

    /// 运动过程中无法获取当前位置
    #[error("No communication with rotator during movement")]
    TelemetryLost,
}

impl RotatorError {
    /// 是否为致命错误
    ///
    /// 致命错误表示会话已不可用（或转台状态未知），应停止桥接。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout
                | Self::ConnectionLost(_)
                | Self::Link(_)
                | Self::InvalidConfig { .. }
                | Self::TelemetryLost
        )
    }

    /// 是否为运动失败（`command_position` 阻塞模式的失败结果）
    pub fn is_movement_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidTarget(_)
                | Self::MovementRejected(_)
                | Self::MovementTimeout { .. }
                | Self::TelemetryLost
        )
    }

    /// 严重程度（越大越严重），决定失败时的日志级别
    ///
    /// 遥测丢失高于运动超时：前者意味着转台状态未知。
    pub fn severity(&self) -> u8 {
        match self {
            Self::ProtocolError { .. } | Self::ParseFailure(_) => 1,
            Self::Timeout | Self::InvalidTarget(_) | Self::MovementRejected(_) => 2,
            Self::MovementTimeout { .. } => 3,
            Self::TelemetryLost => 4,
            Self::ConnectionLost(_) | Self::Link(_) | Self::ConnectTimeout => 5,
            Self::InvalidConfig { .. } => 6,
        }
    }

    /// 转台状态未知或会话不可用（严重程度不低于遥测丢失）
    pub fn is_severe(&self) -> bool {
        self.severity() >= Self::TelemetryLost.severity()
    }
}

/// 客户端 Result 类型
pub type Result<T> = std::result::Result<T, RotatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_fatal() {
        assert!(RotatorError::ConnectTimeout.is_fatal());
        assert!(RotatorError::ConnectionLost("reset".into()).is_fatal());
        assert!(RotatorError::TelemetryLost.is_fatal());
        assert!(!RotatorError::Timeout.is_fatal());
        assert!(!RotatorError::MovementTimeout { timeout_ms: 120_000 }.is_fatal());
        assert!(!RotatorError::MovementRejected(CommandResult::Timeout).is_fatal());
        assert!(!RotatorError::ProtocolError { response: "RPRT -11\n".into() }.is_fatal());
        assert!(
            !RotatorError::InvalidTarget(ProtocolError::NonFinite { field: "azimuth" }).is_fatal()
        );
    }

    #[test]
    fn test_is_movement_failure() {
        assert!(RotatorError::MovementRejected(CommandResult::ConnectionLost).is_movement_failure());
        assert!(RotatorError::MovementTimeout { timeout_ms: 1 }.is_movement_failure());
        assert!(RotatorError::TelemetryLost.is_movement_failure());
        assert!(
            RotatorError::InvalidTarget(ProtocolError::NonFinite { field: "elevation" })
                .is_movement_failure()
        );
        assert!(!RotatorError::Timeout.is_movement_failure());
        assert!(!RotatorError::ConnectTimeout.is_movement_failure());
    }

    #[test]
    fn test_telemetry_lost_outranks_timeout() {
        assert!(
            RotatorError::TelemetryLost.severity()
                > RotatorError::MovementTimeout { timeout_ms: 1 }.severity()
        );
        assert!(RotatorError::TelemetryLost.is_severe());
        assert!(RotatorError::ConnectionLost("eof".into()).is_severe());
        assert!(!RotatorError::MovementTimeout { timeout_ms: 1 }.is_severe());
        assert!(!RotatorError::MovementRejected(CommandResult::Timeout).is_severe());
    }

    #[test]
    fn test_error_display() {
        let err = RotatorError::MovementRejected(CommandResult::ProtocolError("RPRT -1".into()));
        assert_eq!(
            err.to_string(),
            "Movement command rejected: protocol error (\"RPRT -1\")"
        );
        let err = RotatorError::MovementTimeout { timeout_ms: 120_000 };
        assert_eq!(err.to_string(), "Movement timeout after 120000ms");
    }
}
