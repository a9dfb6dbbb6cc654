//! # rotbridge 工具库
//!
//! CLI 与模拟器共用的配置加载（TOML 文件 + `ROTBRIDGE_*` 环境变量）。

pub mod config;

pub use config::{
    BridgeConfig, ConfigError, ControlSection, ENV_PREFIX, ListenerSection, RotctldSection,
};
