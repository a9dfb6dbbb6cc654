//! 位置查询命令

use crate::settings::{self, GlobalArgs};
use anyhow::{Context, Result};
use clap::Args;

/// 位置查询命令参数
#[derive(Args, Debug)]
pub struct PositionCommand {
    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,
}

impl PositionCommand {
    pub fn execute(&self, global: &GlobalArgs) -> Result<()> {
        let config = global.load_config()?;
        let mut client = settings::connect(&config)?;

        let position = client.try_query_position().context("查询指向失败")?;
        if self.json {
            println!("{}", serde_json::to_string(&position)?);
        } else {
            println!("Azimuth:   {:.1}°", position.azimuth);
            println!("Elevation: {:.1}°", position.elevation);
        }
        Ok(())
    }
}
