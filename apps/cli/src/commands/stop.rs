//! 停止命令

use crate::settings::{self, GlobalArgs};
use anyhow::Result;
use clap::Args;

/// 停止命令参数
#[derive(Args, Debug)]
pub struct StopCommand {}

impl StopCommand {
    /// 发送 `S`（尽力而为，应答不做要求）
    pub fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let config = global.load_config()?;
        let mut client = settings::connect(&config)?;

        println!("🛑 Halting rotator...");
        client.halt();
        client.close();
        Ok(())
    }
}
