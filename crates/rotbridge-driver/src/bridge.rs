//! 桥接装配：监听器 → 中继 → 控制循环

use crate::control_loop::{ControlLoop, ControlLoopConfig, ControlSummary, RotatorControl};
use crate::error::DriverError;
use crate::listener::{ListenerConfig, PositionListener};
use crate::metrics::BridgeMetrics;
use crate::relay::LatestValueRelay;
use crossbeam_channel::Receiver;
use rotbridge_protocol::Position;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// 已启动的桥接（监听线程运行中）
pub struct Bridge {
    listener: PositionListener,
    control: ControlLoop,
    metrics: Arc<BridgeMetrics>,
}

impl Bridge {
    /// 绑定广播端口并启动监听线程
    pub fn start(
        listener_config: &ListenerConfig,
        control_config: ControlLoopConfig,
        shutdown: Receiver<()>,
    ) -> Result<Self, DriverError> {
        let metrics = Arc::new(BridgeMetrics::new());
        let (targets_tx, targets_rx) = LatestValueRelay::with_metrics(metrics.clone()).split();

        let listener = PositionListener::spawn(listener_config, metrics.clone(), move |report| {
            info!(
                "MacDoppler - New position: {}, {} ({})",
                report.azimuth, report.elevation, report.satellite
            );
            if let Err(e) = targets_tx.publish(Position::new(report.azimuth, report.elevation)) {
                warn!("Dropping MacDoppler report: {}", e);
            }
        })?;

        let control = ControlLoop::new(control_config, targets_rx, shutdown, metrics.clone());
        Ok(Self {
            listener,
            control,
            metrics,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn metrics(&self) -> Arc<BridgeMetrics> {
        self.metrics.clone()
    }

    /// 在当前线程运行控制循环
    ///
    /// 结束时（正常或失败）依次：停止监听、停止转台（`S`）、关闭会话。
    pub fn run<R: RotatorControl + ?Sized>(
        mut self,
        rotator: &mut R,
    ) -> Result<ControlSummary, DriverError> {
        let result = self.control.run(rotator);
        self.listener.stop();
        info!("Halting rotator");
        rotator.halt();
        rotator.close();
        result
    }
}
