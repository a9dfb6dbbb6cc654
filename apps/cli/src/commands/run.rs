//! 桥接命令
//!
//! 先连接 rotctld（失败即退出），再绑定广播端口并运行控制循环，
//! 直到 Ctrl+C 或转台运动失败。

use crate::settings::{self, GlobalArgs};
use anyhow::{Context, Result};
use clap::Args;
use rotbridge_driver::{Bridge, DryRunRotator, shutdown_channel};
use rotbridge_tools::BridgeConfig;
use tracing::info;

/// 桥接命令参数
#[derive(Args, Debug, Default)]
pub struct RunCommand {
    /// 不连接 rotctld，只打印收到的目标
    #[arg(long)]
    pub dummy: bool,

    /// 到达判定容差（度，默认 5.0）
    #[arg(long)]
    pub movement_threshold: Option<f64>,

    /// 两次取目标的间隔（秒，默认 5.0）
    #[arg(long)]
    pub update_period: Option<f64>,

    /// 运动中的位置轮询间隔（秒，默认 3.0）
    #[arg(long)]
    pub poll_rate: Option<f64>,

    /// 单次运动超时（秒，默认 120）
    #[arg(long)]
    pub movement_timeout: Option<f64>,

    /// MacDoppler 广播端口（默认 9932）
    #[arg(long)]
    pub listen_port: Option<u16>,
}

impl RunCommand {
    pub fn apply(&self, config: &mut BridgeConfig) {
        if self.dummy {
            config.control.dummy = true;
        }
        if let Some(threshold) = self.movement_threshold {
            config.rotctld.movement_threshold = threshold;
        }
        if let Some(period) = self.update_period {
            config.control.update_period_secs = period;
        }
        if let Some(poll) = self.poll_rate {
            config.rotctld.poll_interval_secs = poll;
        }
        if let Some(timeout) = self.movement_timeout {
            config.rotctld.movement_timeout_secs = timeout;
        }
        if let Some(port) = self.listen_port {
            config.listener.port = port;
        }
    }

    pub fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let mut config = global.load_config()?;
        self.apply(&mut config);
        config.validate().context("配置无效")?;

        let client = if config.control.dummy {
            info!("Dummy mode: rotctld will not be contacted");
            None
        } else {
            Some(settings::connect(&config)?)
        };

        let (handle, shutdown) = shutdown_channel();
        ctrlc::set_handler(move || {
            eprintln!("\nReceived interrupt signal. Shutting down...");
            handle.shutdown();
        })
        .context("设置 Ctrl+C 处理失败")?;

        let bridge = Bridge::start(
            &config.listener_config()?,
            config.control_loop_config()?,
            shutdown,
        )
        .context("启动广播监听失败")?;
        info!(
            "Listening for MacDoppler broadcasts on {}. Press Ctrl+C to stop.",
            bridge.listen_addr()
        );
        let metrics = bridge.metrics();

        let summary = match client {
            Some(mut client) => bridge.run(&mut client),
            None => bridge.run(&mut DryRunRotator::new()),
        }
        .context("桥接异常结束")?;

        let snapshot = metrics.snapshot();
        info!(
            "Bridge stopped: {} moves, {} datagrams ({} undecodable, {} superseded)",
            summary.moves,
            snapshot.datagrams_received,
            snapshot.decode_failures,
            snapshot.relay_overwrites
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags_override_config() {
        let cmd = RunCommand {
            dummy: true,
            poll_rate: Some(1.0),
            listen_port: Some(9100),
            ..RunCommand::default()
        };
        let mut config = BridgeConfig::default();
        cmd.apply(&mut config);

        assert!(config.control.dummy);
        assert_eq!(config.rotctld.poll_interval_secs, 1.0);
        assert_eq!(config.listener.port, 9100);
        assert_eq!(config.rotctld.movement_threshold, 5.0);
    }

    #[test]
    fn test_unset_flags_keep_config() {
        let mut config = BridgeConfig::default();
        config.control.update_period_secs = 7.0;
        RunCommand::default().apply(&mut config);
        assert_eq!(config.control.update_period_secs, 7.0);
        assert!(!config.control.dummy);
    }
}
