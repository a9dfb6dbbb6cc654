//! Hamlib `RPRT n` 状态行
//!
//! rotctld 对设置类命令回复 `RPRT <code>`，`0` 表示成功，负数为 Hamlib 错误码。
//! 命令是否成功只由 [`crate::is_ack`] 判定，这里的解码仅用于诊断日志。

use crate::ProtocolError;
use std::fmt;

/// 状态行前缀
pub const RPRT_PREFIX: &str = "RPRT";

/// Hamlib 错误码（`rig.h` 中 `enum rig_errcode_e` 的负值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive)]
#[repr(i32)]
pub enum HamlibErrorCode {
    /// 无错误
    Ok = 0,
    /// 参数无效
    InvalidParameter = -1,
    /// 配置无效
    InvalidConfiguration = -2,
    /// 内存不足
    OutOfMemory = -3,
    /// 功能未实现
    NotImplemented = -4,
    /// 通信超时
    Timeout = -5,
    /// IO 错误
    Io = -6,
    /// Hamlib 内部错误
    Internal = -7,
    /// 协议错误
    Protocol = -8,
    /// 命令被设备拒绝
    Rejected = -9,
    /// 参数被截断
    Truncated = -10,
    /// 功能不可用
    NotAvailable = -11,
    /// VFO 不可达
    TargetNotAvailable = -12,
    /// 总线错误
    BusError = -13,
    /// 总线冲突
    BusBusy = -14,
    /// 参数非法
    InvalidArgument = -15,
    /// VFO 无效
    InvalidVfo = -16,
    /// 参数超出范围
    OutOfDomain = -17,
}

impl HamlibErrorCode {
    /// 简短描述（与 `rigerror()` 的措辞一致）
    pub fn description(self) -> &'static str {
        match self {
            Self::Ok => "Command completed successfully",
            Self::InvalidParameter => "Invalid parameter",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::OutOfMemory => "Memory shortage",
            Self::NotImplemented => "Feature not implemented",
            Self::Timeout => "Communication timed out",
            Self::Io => "IO error",
            Self::Internal => "Internal Hamlib error",
            Self::Protocol => "Protocol error",
            Self::Rejected => "Command rejected by the rig",
            Self::Truncated => "Command performed, but arg truncated",
            Self::NotAvailable => "Function not available",
            Self::TargetNotAvailable => "VFO not targetable",
            Self::BusError => "Error talking on the bus",
            Self::BusBusy => "Collision on the bus",
            Self::InvalidArgument => "NULL RIG handle or invalid pointer parameter",
            Self::InvalidVfo => "Invalid VFO",
            Self::OutOfDomain => "Argument out of domain of func",
        }
    }
}

/// 解码后的 `RPRT n` 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HamlibStatus {
    pub code: i32,
}

impl HamlibStatus {
    pub const OK: Self = Self { code: 0 };

    pub const fn from_code(code: HamlibErrorCode) -> Self {
        Self { code: code as i32 }
    }

    /// 线上格式 `RPRT n\n`
    pub fn to_line(&self) -> String {
        format!("{} {}\n", RPRT_PREFIX, self.code)
    }

    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    /// 已知错误码；正数或未登记的值返回 `None`
    pub fn error_code(&self) -> Option<HamlibErrorCode> {
        HamlibErrorCode::try_from(self.code).ok()
    }

    /// 解析单行 `RPRT n`
    pub fn parse_line(line: &str) -> Result<Self, ProtocolError> {
        let trimmed = line.trim();
        let rest = trimmed
            .strip_prefix(RPRT_PREFIX)
            .ok_or_else(|| ProtocolError::MalformedStatus(trimmed.to_string()))?;
        let code = rest
            .trim()
            .parse::<i32>()
            .map_err(|_| ProtocolError::MalformedStatus(trimmed.to_string()))?;
        Ok(Self { code })
    }

    /// 在多行应答中查找第一条 `RPRT` 状态行
    pub fn find_in(response: &str) -> Option<Self> {
        response
            .lines()
            .find(|line| line.trim_start().starts_with(RPRT_PREFIX))
            .and_then(|line| Self::parse_line(line).ok())
    }
}

impl fmt::Display for HamlibStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error_code() {
            Some(code) => write!(f, "RPRT {} ({})", self.code, code.description()),
            None => write!(f, "RPRT {} (unknown status)", self.code),
        }
    }
}
