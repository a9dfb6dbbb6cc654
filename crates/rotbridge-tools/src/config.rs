//! # 桥接配置
//!
//! 优先级（低 → 高）：内置默认值 → 配置文件 → `ROTBRIDGE_*` 环境变量 → 命令行参数。
//!
//! 配置文件路径：
//! - 显式指定（`--config <file>`），不存在时报错
//! - 否则 `dirs::config_dir()/rotbridge/config.toml`（存在才读取）
//!
//! ```toml
//! [rotctld]
//! host = "localhost"
//! port = 4533
//! timeout_secs = 5.0
//! poll_interval_secs = 3.0
//! movement_threshold = 5.0
//! movement_timeout_secs = 120.0
//!
//! [listener]
//! bind_address = "0.0.0.0"
//! port = 9932
//!
//! [control]
//! update_period_secs = 5.0
//! dummy = false
//! ```

use rotbridge_client::SessionConfig;
use rotbridge_driver::{ControlLoopConfig, ListenerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "ROTBRIDGE_";

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value {value:?} for {name}")]
    Env { name: String, value: String },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Cannot determine the user config directory")]
    NoConfigDir,
}

/// rotctld 会话配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotctldSection {
    pub host: String,
    pub port: u16,
    /// 连接 / 读写超时（秒）
    pub timeout_secs: f64,
    /// 阻塞运动时的轮询间隔（秒）
    pub poll_interval_secs: f64,
    /// 到达判定容差（度）
    pub movement_threshold: f64,
    /// 阻塞运动超时（秒）
    pub movement_timeout_secs: f64,
}

impl Default for RotctldSection {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 4533,
            timeout_secs: 5.0,
            poll_interval_secs: 3.0,
            movement_threshold: 5.0,
            movement_timeout_secs: 120.0,
        }
    }
}

/// 广播监听配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerSection {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ListenerSection {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 9932,
        }
    }
}

/// 控制循环配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSection {
    /// 取目标周期（秒）
    pub update_period_secs: f64,
    /// 不连接 rotctld，只记录目标
    pub dummy: bool,
}

impl Default for ControlSection {
    fn default() -> Self {
        Self {
            update_period_secs: 5.0,
            dummy: false,
        }
    }
}

/// 桥接配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub rotctld: RotctldSection,
    pub listener: ListenerSection,
    pub control: ControlSection,
}

impl BridgeConfig {
    /// 默认配置文件路径
    ///
    /// - Linux: `~/.config/rotbridge/config.toml`
    /// - macOS: `~/Library/Application Support/rotbridge/config.toml`
    /// - Windows: `%APPDATA%\rotbridge\config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rotbridge").join("config.toml"))
    }

    /// 从文件加载
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 按优先级加载：显式文件 / 默认文件 / 默认值，再叠加环境变量
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.is_file() => {
                    debug!("Loading config from {}", path.display());
                    Self::load_from_file(&path)?
                },
                _ => Self::default(),
            },
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 写入文件（自动创建父目录）
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, self.to_toml_string()?).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 叠加进程环境变量
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// 叠加任意来源的 `ROTBRIDGE_*` 变量
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            let name = format!("{}{}", ENV_PREFIX, key);
            lookup(&name).map(|value| (name, value))
        };

        if let Some((_, value)) = get("HOST") {
            self.rotctld.host = value;
        }
        if let Some((name, value)) = get("PORT") {
            self.rotctld.port = parse_env(&name, &value)?;
        }
        if let Some((name, value)) = get("TIMEOUT") {
            self.rotctld.timeout_secs = parse_env(&name, &value)?;
        }
        if let Some((name, value)) = get("POLL_RATE") {
            self.rotctld.poll_interval_secs = parse_env(&name, &value)?;
        }
        if let Some((name, value)) = get("MOVEMENT_THRESHOLD") {
            self.rotctld.movement_threshold = parse_env(&name, &value)?;
        }
        if let Some((name, value)) = get("MOVEMENT_TIMEOUT") {
            self.rotctld.movement_timeout_secs = parse_env(&name, &value)?;
        }
        if let Some((_, value)) = get("LISTEN_ADDRESS") {
            self.listener.bind_address = value;
        }
        if let Some((name, value)) = get("LISTEN_PORT") {
            self.listener.port = parse_env(&name, &value)?;
        }
        if let Some((name, value)) = get("UPDATE_PERIOD") {
            self.control.update_period_secs = parse_env(&name, &value)?;
        }
        if let Some((name, value)) = get("DUMMY") {
            self.control.dummy = parse_bool(&name, &value)?;
        }
        Ok(())
    }

    /// 检查数值范围与地址格式
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rotctld.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "rotctld.host",
                reason: "must not be empty".into(),
            });
        }
        positive_secs("rotctld.timeout_secs", self.rotctld.timeout_secs)?;
        positive_secs("rotctld.poll_interval_secs", self.rotctld.poll_interval_secs)?;
        non_negative_secs(
            "rotctld.movement_timeout_secs",
            self.rotctld.movement_timeout_secs,
        )?;
        positive_secs("control.update_period_secs", self.control.update_period_secs)?;
        if !self.rotctld.movement_threshold.is_finite() || self.rotctld.movement_threshold <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "rotctld.movement_threshold",
                reason: format!("must be positive, got {}", self.rotctld.movement_threshold),
            });
        }
        self.bind_ip()?;
        Ok(())
    }

    /// 转换为 rotctld 会话参数
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        Ok(SessionConfig::new(self.rotctld.host.clone(), self.rotctld.port)
            .with_timeout(positive_secs("rotctld.timeout_secs", self.rotctld.timeout_secs)?)
            .with_poll_interval(positive_secs(
                "rotctld.poll_interval_secs",
                self.rotctld.poll_interval_secs,
            )?)
            .with_movement_threshold(self.rotctld.movement_threshold)
            .with_movement_timeout(non_negative_secs(
                "rotctld.movement_timeout_secs",
                self.rotctld.movement_timeout_secs,
            )?))
    }

    /// 转换为监听参数
    pub fn listener_config(&self) -> Result<ListenerConfig, ConfigError> {
        Ok(ListenerConfig {
            bind_addr: SocketAddr::new(self.bind_ip()?, self.listener.port),
            ..ListenerConfig::default()
        })
    }

    /// 转换为控制循环参数
    pub fn control_loop_config(&self) -> Result<ControlLoopConfig, ConfigError> {
        Ok(ControlLoopConfig {
            update_period: positive_secs(
                "control.update_period_secs",
                self.control.update_period_secs,
            )?,
        })
    }

    fn bind_ip(&self) -> Result<IpAddr, ConfigError> {
        self.listener
            .bind_address
            .parse()
            .map_err(|_| ConfigError::Invalid {
                field: "listener.bind_address",
                reason: format!("not an IP address: {:?}", self.listener.bind_address),
            })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

fn non_negative_secs(field: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::Invalid {
        field,
        reason: format!("not a valid duration: {}", secs),
    })
}

fn positive_secs(field: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    let duration = non_negative_secs(field, secs)?;
    if duration.is_zero() {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be positive".into(),
        });
    }
    Ok(duration)
}
