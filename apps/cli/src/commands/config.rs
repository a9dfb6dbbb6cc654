//! 配置管理命令

use crate::settings::GlobalArgs;
use anyhow::{Context, Result, bail};
use clap::Subcommand;
use rotbridge_tools::BridgeConfig;
use std::path::PathBuf;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印生效的配置（文件 + 环境变量 + 全局参数）
    Show,

    /// 写入默认配置文件
    Init {
        /// 目标路径（默认 <config_dir>/rotbridge/config.toml）
        #[arg(long)]
        path: Option<PathBuf>,

        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self, global: &GlobalArgs) -> Result<()> {
        match self {
            ConfigCommand::Show => {
                let config = global.load_config()?;
                print!("{}", config.to_toml_string()?);
                Ok(())
            },
            ConfigCommand::Init { path, force } => {
                let path = match path {
                    Some(path) => path,
                    None => BridgeConfig::default_path().context("无法确定配置目录")?,
                };
                init_file(&path, force)?;
                println!("✅ Wrote {}", path.display());
                Ok(())
            },
        }
    }
}

fn init_file(path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    BridgeConfig::default().save_to_file(path)?;
    Ok(())
}
