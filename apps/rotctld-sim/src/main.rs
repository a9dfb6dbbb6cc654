//! 模拟 rotctld 守护进程
//!
//! 无硬件时用于联调 rotbridge：
//!
//! ```bash
//! rotctld-sim --listen 127.0.0.1:4533 --slew-rate 6
//! rotbridge --host 127.0.0.1 run
//! ```

mod model;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use server::{RotctldServer, SimConfig};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 模拟 rotctld
///
/// 支持 `_` / `P` / `p` / `S` / `q` 命令，转台以恒定角速度运动
#[derive(Parser, Debug)]
#[command(name = "rotctld-sim")]
#[command(about = "Simulated Hamlib rotctld daemon", long_about = None)]
#[command(version)]
struct Args {
    /// TCP 监听地址
    #[arg(long, default_value = "127.0.0.1:4533")]
    listen: SocketAddr,

    /// 角速度（度/秒），0 表示瞬间到位
    #[arg(long, default_value_t = 6.0)]
    slew_rate: f64,

    /// `_` 命令返回的型号
    #[arg(long, default_value = "Simulated rotator")]
    model: String,

    /// 输出 debug 日志（含收发原文）
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let server = RotctldServer::bind(
        args.listen,
        SimConfig {
            model: args.model.clone(),
            slew_rate: args.slew_rate,
        },
    )
    .with_context(|| format!("无法监听 {}", args.listen))?;

    let running = server.running_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nReceived interrupt signal. Shutting down...");
        running.store(false, Ordering::Release);
    })
    .context("设置 Ctrl+C 处理失败")?;

    info!(
        "rotctld-sim listening on {} (model {:?}, {} deg/s). Press Ctrl+C to stop.",
        server.local_addr()?,
        args.model,
        args.slew_rate
    );
    server.serve().context("监听异常退出")?;
    Ok(())
}
