//! # rotbridge Protocol
//!
//! 转台控制与卫星指向广播的文本协议定义（无 IO 依赖）
//!
//! ## 模块
//!
//! - `rotctld`: Hamlib rotctld 命令编码 / 应答解析
//! - `hamlib`: `RPRT n` 状态码定义
//! - `macdoppler`: MacDoppler UDP 广播报文解析
//!
//! ## 角度约定
//!
//! 所有角度单位均为度（degree）。发送给转台之前：
//! - NaN / 无穷大直接拒绝
//! - 方位角（azimuth）按 360 取模，落在 `[0, 360)`
//! - 俯仰角（elevation）钳位到 `[0, 90]`，不拒绝越界值
//! - 两轴都舍入到线上精度 0.1°

pub mod hamlib;
pub mod macdoppler;
pub mod rotctld;

// 重新导出常用类型
pub use hamlib::{HamlibErrorCode, HamlibStatus};
pub use macdoppler::{PointingReport, parse_packet};
pub use rotctld::{RotctldCommand, is_ack, parse_position_reply};

use std::fmt;
use thiserror::Error;

/// 方位角上限（不含）
pub const AZIMUTH_MODULUS: f64 = 360.0;

/// 俯仰角下限
pub const ELEVATION_MIN: f64 = 0.0;

/// 俯仰角上限
pub const ELEVATION_MAX: f64 = 90.0;

/// 线上角度分辨率的倒数（`P` 命令保留一位小数）
const WIRE_STEPS_PER_DEGREE: f64 = 10.0;

/// 天线指向（方位角 / 俯仰角，单位：度）
///
/// 既用于目标指向，也用于转台回报的实际指向。
/// 通过 [`Position::target`] 构造的值满足发送不变量；
/// 通过 [`Position::new`] 构造的值保持原样（例如转台回报值）。
///
/// # 示例
///
/// ```rust
/// use rotbridge_protocol::Position;
///
/// let target = Position::target(370.0, 95.0)?;
/// assert_eq!(target.azimuth, 10.0);
/// assert_eq!(target.elevation, 90.0);
///
/// assert!(Position::target(f64::NAN, 10.0).is_err());
/// # Ok::<(), rotbridge_protocol::ProtocolError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// 方位角（度）
    pub azimuth: f64,
    /// 俯仰角（度）
    pub elevation: f64,
}

impl Position {
    /// 原样构造（不做归一化）
    pub const fn new(azimuth: f64, elevation: f64) -> Self {
        Self { azimuth, elevation }
    }

    /// 构造发送用目标指向
    ///
    /// 方位角归一化到 `[0, 360)`，俯仰角钳位到 `[0, 90]`，再舍入到 0.1°。
    /// 结果与 `P` 命令的线上文本一致，到达判断也以它为准
    /// （359.97° 发送为 `P 0.0`，目标即为 0.0°）。
    ///
    /// 任一轴为 NaN 或无穷大时返回 [`ProtocolError::NonFinite`]。
    pub fn target(azimuth: f64, elevation: f64) -> Result<Self, ProtocolError> {
        if !azimuth.is_finite() {
            return Err(ProtocolError::NonFinite { field: "azimuth" });
        }
        if !elevation.is_finite() {
            return Err(ProtocolError::NonFinite { field: "elevation" });
        }
        Ok(Self {
            azimuth: normalize_azimuth(round_to_wire(normalize_azimuth(azimuth))),
            elevation: round_to_wire(clamp_elevation(elevation)),
        })
    }

    /// 判断回报指向是否已到达本目标（容差比较）
    ///
    /// 回报方位角先按 360 取模，再与目标比较。两轴的绝对差都必须
    /// **严格小于** `threshold`，恰好等于阈值不算到达。
    /// 不做 0/360 跨界比较（359.9° 与 0.1° 视为相距 359.8°）。
    pub fn is_within(&self, reported: &Position, threshold: f64) -> bool {
        let az_error = (self.azimuth - normalize_azimuth(reported.azimuth)).abs();
        let el_error = (self.elevation - reported.elevation).abs();
        az_error < threshold && el_error < threshold
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}, {:.1}", self.azimuth, self.elevation)
    }
}

/// 方位角归一化到 `[0, 360)`
///
/// 使用欧几里得取模，负数同样落在区间内。
/// `rem_euclid` 对极小负数可能舍入得到 360.0，这里折回 0.0。
pub fn normalize_azimuth(azimuth: f64) -> f64 {
    let normalized = azimuth.rem_euclid(AZIMUTH_MODULUS);
    if normalized >= AZIMUTH_MODULUS {
        0.0
    } else {
        normalized
    }
}

/// 俯仰角钳位到 `[0, 90]`
pub fn clamp_elevation(elevation: f64) -> f64 {
    elevation.clamp(ELEVATION_MIN, ELEVATION_MAX)
}

/// 舍入到线上精度（0.1°）
///
/// 调用方先把值限制在 `[0, 360]` 内，乘法不会溢出。
fn round_to_wire(degrees: f64) -> f64 {
    (degrees * WIRE_STEPS_PER_DEGREE).round() / WIRE_STEPS_PER_DEGREE
}

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Empty response")]
    EmptyResponse,

    #[error("Missing field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid number for field {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Malformed status line: {0:?}")]
    MalformedStatus(String),

    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),

    #[error("Non-finite value for field {field}")]
    NonFinite { field: &'static str },
}

/// 解析十进制角度文本（去除首尾空白，拒绝 NaN / 无穷大）
pub(crate) fn parse_degrees(field: &'static str, text: &str) -> Result<f64, ProtocolError> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ProtocolError::InvalidNumber {
            field,
            value: trimmed.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_azimuth_basic() {
        assert_eq!(normalize_azimuth(0.0), 0.0);
        assert_eq!(normalize_azimuth(359.9), 359.9);
        assert_eq!(normalize_azimuth(360.0), 0.0);
        assert_eq!(normalize_azimuth(370.0), 10.0);
        assert_eq!(normalize_azimuth(-10.0), 350.0);
        assert_eq!(normalize_azimuth(720.5), 0.5);
    }

    #[test]
    fn test_normalize_azimuth_tiny_negative() {
        // rem_euclid 舍入到 360.0 的边界情况
        let normalized = normalize_azimuth(-1e-20);
        assert!((0.0..360.0).contains(&normalized), "got {}", normalized);
    }

    #[test]
    fn test_clamp_elevation() {
        assert_eq!(clamp_elevation(-5.0), 0.0);
        assert_eq!(clamp_elevation(0.0), 0.0);
        assert_eq!(clamp_elevation(45.5), 45.5);
        assert_eq!(clamp_elevation(90.0), 90.0);
        assert_eq!(clamp_elevation(120.0), 90.0);
    }

    #[test]
    fn test_position_target() {
        let target = Position::target(-90.0, -1.0).unwrap();
        assert_eq!(target, Position::new(270.0, 0.0));
    }

    #[test]
    fn test_position_target_rounds_to_wire_precision() {
        assert_eq!(
            Position::target(123.456, 45.26).unwrap(),
            Position::new(123.5, 45.3)
        );
        // 舍入后折回 0°，与发送文本 `P 0.0` 一致
        assert_eq!(
            Position::target(359.97, 10.0).unwrap(),
            Position::new(0.0, 10.0)
        );
        assert_eq!(
            Position::target(359.94, 89.97).unwrap(),
            Position::new(359.9, 90.0)
        );
        let huge = Position::target(1e300, -1e300).unwrap();
        assert!((0.0..360.0).contains(&huge.azimuth), "got {}", huge);
        assert_eq!(huge.elevation, 0.0);
    }

    #[test]
    fn test_position_target_rejects_non_finite() {
        assert_eq!(
            Position::target(f64::NAN, 10.0),
            Err(ProtocolError::NonFinite { field: "azimuth" })
        );
        assert_eq!(
            Position::target(10.0, f64::INFINITY),
            Err(ProtocolError::NonFinite { field: "elevation" })
        );
        assert_eq!(
            Position::target(f64::NEG_INFINITY, f64::NAN),
            Err(ProtocolError::NonFinite { field: "azimuth" })
        );
    }

    #[test]
    fn test_target_arrives_at_reported_north() {
        let target = Position::target(359.97, 10.0).unwrap();
        assert!(target.is_within(&Position::new(0.0, 10.0), 5.0));
    }

    #[test]
    fn test_is_within_strict_threshold() {
        let target = Position::new(100.0, 10.0);

        assert!(target.is_within(&Position::new(97.0, 12.0), 5.0));
        // 恰好等于阈值不算到达
        assert!(!target.is_within(&Position::new(95.0, 10.0), 5.0));
        assert!(!target.is_within(&Position::new(100.0, 15.0), 5.0));
    }

    #[test]
    fn test_is_within_normalizes_reported_azimuth() {
        let target = Position::new(10.0, 0.0);
        assert!(target.is_within(&Position::new(371.0, 0.0), 5.0));
        assert!(target.is_within(&Position::new(-348.0, 0.0), 5.0));
    }

    #[test]
    fn test_is_within_no_wraparound() {
        let target = Position::new(359.0, 0.0);
        assert!(!target.is_within(&Position::new(1.0, 0.0), 5.0));
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::new(39.0, 0.04).to_string(), "39.0, 0.0");
    }

    #[test]
    fn test_parse_degrees() {
        assert_eq!(parse_degrees("azimuth", " 12.5\r").unwrap(), 12.5);
        assert!(matches!(
            parse_degrees("azimuth", "abc"),
            Err(ProtocolError::InvalidNumber { field: "azimuth", .. })
        ));
        assert!(parse_degrees("azimuth", "NaN").is_err());
        assert!(parse_degrees("azimuth", "inf").is_err());
        assert!(parse_degrees("azimuth", "").is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_position_serde() {
        let json = serde_json::to_string(&Position::new(39.0, 0.0)).unwrap();
        assert_eq!(json, r#"{"azimuth":39.0,"elevation":0.0}"#);
    }
}
