//! 移动命令

use crate::settings::{self, GlobalArgs};
use anyhow::{Context, Result};
use clap::Args;
use rotbridge_client::{MoveMode, Position};

/// 移动命令参数
#[derive(Args, Debug)]
pub struct MoveCommand {
    /// 目标方位角（度，任意值，发送前归一化到 [0, 360)）
    #[arg(long, allow_negative_numbers = true)]
    pub azimuth: f64,

    /// 目标俯仰角（度，发送前钳位到 [0, 90]）
    #[arg(long, allow_negative_numbers = true)]
    pub elevation: f64,

    /// 等待到达目标（轮询间隔 / 容差 / 超时取自配置）
    #[arg(long)]
    pub blocking: bool,
}

impl MoveCommand {
    pub fn execute(&self, global: &GlobalArgs) -> Result<()> {
        // clap 接受 `nan` / `inf`，连接前先拒绝
        Position::target(self.azimuth, self.elevation).context("目标无效")?;

        let config = global.load_config()?;
        let mut client = settings::connect(&config)?;

        let outcome = client.command_position(
            self.azimuth,
            self.elevation,
            MoveMode::from_blocking(self.blocking),
        );
        let arrived = outcome.into_result().context("转台运动失败")?;

        match arrived {
            Some(position) => println!("✅ Arrived at {}", position),
            None => println!("✅ Command accepted"),
        }
        Ok(())
    }
}
