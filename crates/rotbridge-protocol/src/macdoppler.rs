//! MacDoppler "AzEl Rotor Report" UDP 广播报文解析
//!
//! 报文示例：
//!
//! ```text
//! 00000001 Mark’s MacBook Pro [AzEl Rotor Report:Azimuth:39.00, Elevation:0.00, SatName:XW-2C]
//! ```
//!
//! 解析规则（按位置取字段，不做关键字匹配）：
//! - 以 `,` 分割后，字段 0 的第 3 个 `:` 分段为方位角
//! - 字段 1 的第 2 个 `:` 分段为俯仰角
//! - 字段 2 截断到 `]` 之前，其第 2 个 `:` 分段为卫星名称

use crate::{ELEVATION_MAX, ELEVATION_MIN, Position, ProtocolError, parse_degrees};

/// 广播默认端口
pub const DEFAULT_PORT: u16 = 9932;

/// 单个数据报最大长度（字节）
pub const MAX_DATAGRAM_LEN: usize = 1024;

/// 一条解码后的指向广播
///
/// 数值保持原样（不归一化），越界由调用方通过范围判断函数决定如何处理。
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointingReport {
    /// 方位角（度）
    pub azimuth: f64,
    /// 俯仰角（度）
    pub elevation: f64,
    /// 卫星名称
    pub satellite: String,
}

impl PointingReport {
    /// 方位角是否在 `[0, 360]` 内
    pub fn azimuth_in_range(&self) -> bool {
        (0.0..=360.0).contains(&self.azimuth)
    }

    /// 俯仰角是否在 `[0, 90]` 内
    pub fn elevation_in_range(&self) -> bool {
        (ELEVATION_MIN..=ELEVATION_MAX).contains(&self.elevation)
    }

    /// 原始（未归一化）指向
    pub fn position(&self) -> Position {
        Position::new(self.azimuth, self.elevation)
    }
}

/// 解析一条 MacDoppler 广播报文
pub fn parse_packet(packet: &str) -> Result<PointingReport, ProtocolError> {
    if packet.trim().is_empty() {
        return Err(ProtocolError::EmptyResponse);
    }

    let mut fields = packet.split(',');
    let azimuth_field = fields
        .next()
        .ok_or(ProtocolError::MissingField { field: "azimuth" })?;
    let elevation_field = fields
        .next()
        .ok_or(ProtocolError::MissingField { field: "elevation" })?;
    let satellite_field = fields
        .next()
        .ok_or(ProtocolError::MissingField { field: "satellite" })?;

    let azimuth = azimuth_field
        .split(':')
        .nth(2)
        .ok_or(ProtocolError::MissingField { field: "azimuth" })?;
    let elevation = elevation_field
        .split(':')
        .nth(1)
        .ok_or(ProtocolError::MissingField { field: "elevation" })?;
    let satellite = satellite_field
        .split(']')
        .next()
        .and_then(|name| name.split(':').nth(1))
        .ok_or(ProtocolError::MissingField { field: "satellite" })?;

    Ok(PointingReport {
        azimuth: parse_degrees("azimuth", azimuth)?,
        elevation: parse_degrees("elevation", elevation)?,
        satellite: satellite.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "00000001 Mark’s MacBook Pro [AzEl Rotor Report:Azimuth:39.00, Elevation:0.00, SatName:XW-2C]";

    #[test]
    fn test_parse_sample_packet() {
        let report = parse_packet(SAMPLE).unwrap();
        assert_eq!(report.azimuth, 39.0);
        assert_eq!(report.elevation, 0.0);
        assert_eq!(report.satellite, "XW-2C");
        assert!(report.azimuth_in_range());
        assert!(report.elevation_in_range());
    }

    #[test]
    fn test_parse_out_of_range_is_permissive() {
        let packet = "1 X [AzEl Rotor Report:Azimuth:361.50, Elevation:-2.00, SatName:ISS]";
        let report = parse_packet(packet).unwrap();
        assert_eq!(report.position(), Position::new(361.5, -2.0));
        assert!(!report.azimuth_in_range());
        assert!(!report.elevation_in_range());
    }

    #[test]
    fn test_parse_missing_fields() {
        assert_eq!(parse_packet(""), Err(ProtocolError::EmptyResponse));
        assert_eq!(
            parse_packet("1 X [AzEl Rotor Report:Azimuth:39.00"),
            Err(ProtocolError::MissingField { field: "elevation" })
        );
        assert_eq!(
            parse_packet("1 X [AzEl Rotor Report:Azimuth:39.00, Elevation:0.00"),
            Err(ProtocolError::MissingField { field: "satellite" })
        );
        assert_eq!(
            parse_packet("Azimuth:39.00, Elevation:0.00, SatName:AO-91]"),
            Err(ProtocolError::MissingField { field: "azimuth" })
        );
        assert_eq!(
            parse_packet("1 X [AzEl Rotor Report:Azimuth:39.00, Elevation, SatName:AO-91]"),
            Err(ProtocolError::MissingField { field: "elevation" })
        );
    }

    #[test]
    fn test_parse_non_numeric() {
        let packet = "1 X [AzEl Rotor Report:Azimuth:north, Elevation:0.00, SatName:AO-91]";
        assert!(matches!(
            parse_packet(packet),
            Err(ProtocolError::InvalidNumber { field: "azimuth", .. })
        ));
    }
}
