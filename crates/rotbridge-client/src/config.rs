//! rotctld 会话参数

use crate::error::{Result, RotatorError};
use std::time::Duration;

/// 默认 rotctld 地址
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// 默认 rotctld 端口
pub const DEFAULT_PORT: u16 = 4533;

/// 会话参数
///
/// # 默认值
///
/// | 字段 | 默认 |
/// |------|------|
/// | `host` | `127.0.0.1` |
/// | `port` | 4533 |
/// | `timeout` | 5 s（连接 / 读写） |
/// | `poll_interval` | 5 s |
/// | `movement_threshold` | 5° |
/// | `movement_timeout` | 120 s |
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    /// 连接超时，同时作为每次读写的超时
    pub timeout: Duration,
    /// 阻塞运动时的位置轮询间隔
    pub poll_interval: Duration,
    /// 到达判定容差（度）
    pub movement_threshold: f64,
    /// 阻塞运动的最长等待时间
    pub movement_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_secs(5),
            movement_threshold: 5.0,
            movement_timeout: Duration::from_secs(120),
        }
    }
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_movement_threshold(mut self, threshold: f64) -> Self {
        self.movement_threshold = threshold;
        self
    }

    pub fn with_movement_timeout(mut self, movement_timeout: Duration) -> Self {
        self.movement_timeout = movement_timeout;
        self
    }

    /// 参数检查
    ///
    /// 轮询间隔必须为正，否则虚拟时钟下的确认循环无法推进。
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(RotatorError::InvalidConfig {
                param: "host",
                reason: "must not be empty".into(),
            });
        }
        if self.timeout.is_zero() {
            return Err(RotatorError::InvalidConfig {
                param: "timeout",
                reason: "must be positive".into(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(RotatorError::InvalidConfig {
                param: "poll_interval",
                reason: "must be positive".into(),
            });
        }
        if !self.movement_threshold.is_finite() || self.movement_threshold <= 0.0 {
            return Err(RotatorError::InvalidConfig {
                param: "movement_threshold",
                reason: format!("must be a positive number, got {}", self.movement_threshold),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 4533);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.movement_threshold, 5.0);
        assert_eq!(config.movement_timeout, Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = SessionConfig::new("rotator.local", 4600)
            .with_poll_interval(Duration::from_secs(3))
            .with_movement_threshold(2.5);
        assert_eq!(config.host, "rotator.local");
        assert_eq!(config.port, 4600);
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.movement_threshold, 2.5);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = SessionConfig::default().with_poll_interval(Duration::ZERO);
        assert!(matches!(
            bad.validate(),
            Err(RotatorError::InvalidConfig { param: "poll_interval", .. })
        ));

        let bad = SessionConfig::default().with_movement_threshold(f64::NAN);
        assert!(bad.validate().is_err());

        let bad = SessionConfig::new("", 4533);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_zero_movement_timeout_is_allowed() {
        let config = SessionConfig::default().with_movement_timeout(Duration::ZERO);
        assert!(config.validate().is_ok());
    }
}
