//! 全局参数与配置合并
//!
//! 命令行参数优先级最高，覆盖配置文件与 `ROTBRIDGE_*` 环境变量。

use anyhow::{Context, Result};
use clap::Args;
use rotbridge_client::{RotatorClient, SessionConfig};
use rotbridge_tools::BridgeConfig;
use std::path::PathBuf;
use tracing::info;

/// 所有子命令共用的参数
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// rotctld 主机（默认 localhost）
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// rotctld 端口（默认 4533）
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// 连接 / 读写超时（秒，默认 5）
    #[arg(long, global = true)]
    pub timeout: Option<f64>,

    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 输出 debug 日志
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// 加载配置并叠加全局参数（不做校验）
    pub fn load_config(&self) -> Result<BridgeConfig> {
        let mut config = BridgeConfig::load(self.config.as_deref()).context("加载配置失败")?;
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut BridgeConfig) {
        if let Some(ref host) = self.host {
            config.rotctld.host = host.clone();
        }
        if let Some(port) = self.port {
            config.rotctld.port = port;
        }
        if let Some(timeout) = self.timeout {
            config.rotctld.timeout_secs = timeout;
        }
    }
}

/// 校验配置并连接 rotctld
pub fn connect(config: &BridgeConfig) -> Result<RotatorClient> {
    config.validate().context("配置无效")?;
    let session: SessionConfig = config.session_config()?;
    let client = RotatorClient::connect(&session)
        .with_context(|| format!("无法连接 rotctld {}:{}", session.host, session.port))?;
    info!(
        "Connected to rotctld {}:{} ({})",
        session.host,
        session.port,
        client.model()
    );
    Ok(client)
}
