//! 控制循环
//!
//! 每个周期：取出中继中的最新目标 → 阻塞运动到该目标 → 等待 `update_period`
//! （期间可被停止信号唤醒）。运动失败时循环以 [`DriverError::Movement`] 结束。
//! 停止信号只在两次运动之间检查，进行中的运动会先执行完毕。

use crate::error::DriverError;
use crate::metrics::BridgeMetrics;
use crate::relay::RelayReceiver;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use rotbridge_client::{Clock, MoveMode, MoveOutcome, RotatorClient};
use rotbridge_link::LineLink;
use rotbridge_protocol::Position;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 控制循环参数
#[derive(Debug, Clone, PartialEq)]
pub struct ControlLoopConfig {
    /// 两次取目标之间的等待时间
    pub update_period: Duration,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            update_period: Duration::from_secs(5),
        }
    }
}

/// 控制循环可驱动的转台
pub trait RotatorControl {
    fn command_position(&mut self, azimuth: f64, elevation: f64, mode: MoveMode) -> MoveOutcome;

    /// 停止运动（尽力而为）
    fn halt(&mut self);

    fn close(&mut self);
}

impl<L: LineLink, C: Clock> RotatorControl for RotatorClient<L, C> {
    fn command_position(&mut self, azimuth: f64, elevation: f64, mode: MoveMode) -> MoveOutcome {
        RotatorClient::command_position(self, azimuth, elevation, mode)
    }

    fn halt(&mut self) {
        RotatorClient::halt(self)
    }

    fn close(&mut self) {
        RotatorClient::close(self)
    }
}

/// 空转台（`--dummy`）：只记录日志，所有命令立即成功
#[derive(Debug, Default)]
pub struct DryRunRotator {
    commands: Vec<Position>,
}

impl DryRunRotator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已收到的目标（归一化后）
    pub fn commands(&self) -> &[Position] {
        &self.commands
    }
}

impl RotatorControl for DryRunRotator {
    fn command_position(&mut self, azimuth: f64, elevation: f64, mode: MoveMode) -> MoveOutcome {
        let target = match Position::target(azimuth, elevation) {
            Ok(target) => target,
            Err(e) => {
                warn!("Dummy rotator - refusing target ({}, {}): {}", azimuth, elevation, e);
                return MoveOutcome::InvalidTarget(e);
            },
        };
        info!("Dummy rotator - commanded position: {}", target);
        self.commands.push(target);
        match mode {
            MoveMode::NonBlocking => MoveOutcome::Accepted,
            MoveMode::Blocking => MoveOutcome::Arrived(target),
        }
    }

    fn halt(&mut self) {
        debug!("Dummy rotator - halt");
    }

    fn close(&mut self) {}
}

/// 停止句柄（可克隆；全部 drop 也视为停止）
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Sender<()>,
}

impl ShutdownHandle {
    /// 通知控制循环退出（重复调用无副作用）
    pub fn shutdown(&self) {
        let _ = self.tx.try_send(());
    }
}

/// 创建停止通道
pub fn shutdown_channel() -> (ShutdownHandle, Receiver<()>) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (ShutdownHandle { tx }, rx)
}

/// 控制循环运行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlSummary {
    /// 已完成的运动次数
    pub moves: u64,
}

/// 控制循环
pub struct ControlLoop {
    config: ControlLoopConfig,
    targets: RelayReceiver<Position>,
    shutdown: Receiver<()>,
    metrics: Arc<BridgeMetrics>,
}

impl ControlLoop {
    pub fn new(
        config: ControlLoopConfig,
        targets: RelayReceiver<Position>,
        shutdown: Receiver<()>,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            config,
            targets,
            shutdown,
            metrics,
        }
    }

    /// 运行直到收到停止信号或运动失败
    pub fn run<R: RotatorControl + ?Sized>(
        &self,
        rotator: &mut R,
    ) -> Result<ControlSummary, DriverError> {
        let mut summary = ControlSummary::default();

        loop {
            if let Some(target) = self.targets.take_latest()? {
                debug!("New target from relay: {}", target);
                self.metrics.moves_commanded.fetch_add(1, Ordering::Relaxed);

                let outcome =
                    rotator.command_position(target.azimuth, target.elevation, MoveMode::Blocking);
                if let Err(e) = outcome.into_result() {
                    self.metrics.moves_failed.fetch_add(1, Ordering::Relaxed);
                    if e.is_severe() {
                        error!("Movement to {} failed, rotator state unknown: {}", target, e);
                    } else {
                        warn!("Movement to {} failed: {}", target, e);
                    }
                    return Err(DriverError::Movement(e));
                }
                summary.moves += 1;
            }

            match self.shutdown.recv_timeout(self.config.update_period) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    info!("Control loop stopping after {} moves", summary.moves);
                    return Ok(summary);
                },
                Err(RecvTimeoutError::Timeout) => {},
            }
        }
    }
}
