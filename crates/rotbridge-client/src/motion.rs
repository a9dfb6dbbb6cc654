//! 运动确认状态机（move-and-confirm）
//!
//! ```text
//! Commanding ──发送失败──▶ Finished(CommandRejected)
//!     │
//!     ▼
//! WaitingAck ──非 RPRT 0 / 超时 / 断开──▶ Finished(CommandRejected)
//!     │ ack
//!     ├── 非阻塞 ──▶ Finished(Accepted)
//!     ▼
//! Polling ──elapsed ≥ timeout──▶ Finished(MovementTimeout)
//!     │  sleep(poll_interval); p
//!     ├── 查询失败 ──▶ Finished(NoTelemetry)
//!     ├── 容差内 ──▶ Finished(Arrived)
//!     └── 其他 ──▶ Polling
//! ```
//!
//! 每次 [`MoveAndConfirm::step`] 只执行一个状态的动作。轮询次数不设上限，
//! 总时长由 `movement_timeout` 限定（超时检查在休眠之前）。

use crate::config::SessionConfig;
use crate::error::Result;
use crate::types::{CommandResult, MoveMode, MoveOutcome};
use rotbridge_protocol::{Position, RotctldCommand};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 状态机所需的会话能力
///
/// [`crate::RotatorClient`] 是唯一的生产实现；拆出 trait 便于单独驱动状态机。
pub trait RotatorIo {
    /// 写出一条命令（不读应答）
    fn transmit(&mut self, command: &RotctldCommand) -> Result<()>;

    /// 单次读取应答
    fn await_reply(&mut self) -> Result<String>;

    /// 查询当前位置，失败返回 `None`
    fn poll_position(&mut self) -> Option<Position>;

    /// 当前时间（单调）
    fn now(&self) -> Duration;

    fn sleep(&mut self, duration: Duration);
}

/// 状态
#[derive(Debug, Clone, PartialEq)]
pub enum MoveState {
    /// 待发送设置指向命令
    Commanding,
    /// 已发送，等待 `RPRT` 应答
    WaitingAck,
    /// 已确认，轮询位置直到到达或超时
    Polling {
        /// 开始轮询的时间
        started: Duration,
        /// 最后一次回报位置
        last: Option<Position>,
    },
    /// 终态
    Finished(MoveOutcome),
}

/// 一次设置指向操作
#[derive(Debug, Clone)]
pub struct MoveAndConfirm {
    target: Position,
    mode: MoveMode,
    threshold: f64,
    poll_interval: Duration,
    movement_timeout: Duration,
    polls: usize,
    state: MoveState,
}

impl MoveAndConfirm {
    /// `target` 应已通过 [`Position::target`] 构造（与发送文本一致，到达判断以它为准）
    pub fn new(target: Position, mode: MoveMode, config: &SessionConfig) -> Self {
        Self {
            target,
            mode,
            threshold: config.movement_threshold,
            poll_interval: config.poll_interval,
            movement_timeout: config.movement_timeout,
            polls: 0,
            state: MoveState::Commanding,
        }
    }

    pub fn target(&self) -> Position {
        self.target
    }

    pub fn state(&self) -> &MoveState {
        &self.state
    }

    /// 已执行的位置查询次数
    pub fn polls(&self) -> usize {
        self.polls
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, MoveState::Finished(_))
    }

    /// 推进一步；进入（或已处于）终态时返回结果
    pub fn step<I: RotatorIo + ?Sized>(&mut self, io: &mut I) -> Option<MoveOutcome> {
        let next = match self.state.clone() {
            MoveState::Commanding => self.command(io),
            MoveState::WaitingAck => self.wait_ack(io),
            MoveState::Polling { started, last } => self.poll(io, started, last),
            MoveState::Finished(outcome) => return Some(outcome),
        };
        self.state = next;

        match &self.state {
            MoveState::Finished(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }

    /// 运行到终态
    pub fn run<I: RotatorIo + ?Sized>(mut self, io: &mut I) -> MoveOutcome {
        loop {
            if let Some(outcome) = self.step(io) {
                return outcome;
            }
        }
    }

    fn command<I: RotatorIo + ?Sized>(&self, io: &mut I) -> MoveState {
        let command = RotctldCommand::SetPosition(self.target);
        match io.transmit(&command) {
            Ok(()) => MoveState::WaitingAck,
            Err(e) => {
                warn!("Failed to send position command {}: {}", command, e);
                MoveState::Finished(MoveOutcome::CommandRejected(CommandResult::from_error(&e)))
            },
        }
    }

    fn wait_ack<I: RotatorIo + ?Sized>(&self, io: &mut I) -> MoveState {
        let result = match io.await_reply() {
            Ok(response) => CommandResult::from_response(&response),
            Err(e) => CommandResult::from_error(&e),
        };

        if !result.is_ack() {
            match result.hamlib_status() {
                Some(status) => warn!("Position command rejected: {}", status),
                None => warn!("Position command rejected: {}", result),
            }
            return MoveState::Finished(MoveOutcome::CommandRejected(result));
        }

        match self.mode {
            MoveMode::NonBlocking => {
                debug!("Position command accepted: {}", self.target);
                MoveState::Finished(MoveOutcome::Accepted)
            },
            MoveMode::Blocking => {
                info!("Commanded position: {}", self.target);
                MoveState::Polling {
                    started: io.now(),
                    last: None,
                }
            },
        }
    }

    fn poll<I: RotatorIo + ?Sized>(
        &mut self,
        io: &mut I,
        started: Duration,
        last: Option<Position>,
    ) -> MoveState {
        let elapsed = io.now().saturating_sub(started);
        if elapsed >= self.movement_timeout {
            error!(
                "Movement timeout after {:?} (target {}, last {})",
                self.movement_timeout,
                self.target,
                last.map(|p| p.to_string()).unwrap_or_else(|| "unknown".into())
            );
            return MoveState::Finished(MoveOutcome::MovementTimeout {
                last,
                timeout: self.movement_timeout,
            });
        }

        io.sleep(self.poll_interval);
        self.polls += 1;

        let Some(current) = io.poll_position() else {
            error!("No communication with rotator while moving to {}", self.target);
            return MoveState::Finished(MoveOutcome::NoTelemetry);
        };

        info!("Current position: {}", current);
        if self.target.is_within(&current, self.threshold) {
            info!("Arrived at commanded position (within tolerance)");
            MoveState::Finished(MoveOutcome::Arrived(current))
        } else {
            MoveState::Polling {
                started,
                last: Some(current),
            }
        }
    }
}
