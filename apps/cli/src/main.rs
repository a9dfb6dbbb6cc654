//! # rotbridge
//!
//! MacDoppler 广播 → Hamlib rotctld 桥接命令行工具。
//!
//! ```bash
//! # 桥接模式：监听 UDP 9932，跟踪卫星
//! rotbridge --host localhost run --poll-rate 3
//!
//! # 不连接转台，只打印收到的目标
//! rotbridge run --dummy
//!
//! # 单次操作
//! rotbridge position --json
//! rotbridge move --azimuth 180 --elevation 45 --blocking
//! rotbridge stop
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod settings;

use commands::{ConfigCommand, MoveCommand, PositionCommand, RunCommand, StopCommand};
use settings::GlobalArgs;

/// rotbridge - MacDoppler → rotctld 桥接
#[derive(Parser, Debug)]
#[command(name = "rotbridge")]
#[command(about = "Bridge MacDoppler rotor broadcasts to a Hamlib rotctld daemon", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 监听 MacDoppler 广播并驱动转台
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 查询当前指向
    Position {
        #[command(flatten)]
        args: PositionCommand,
    },

    /// 转到指定指向
    Move {
        #[command(flatten)]
        args: MoveCommand,
    },

    /// 停止转台
    Stop {
        #[command(flatten)]
        args: StopCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    match cli.command {
        Commands::Run { args } => args.execute(&cli.global),
        Commands::Position { args } => args.execute(&cli.global),
        Commands::Move { args } => args.execute(&cli.global),
        Commands::Stop { args } => args.execute(&cli.global),
        Commands::Config(cmd) => cmd.execute(&cli.global),
    }
}
