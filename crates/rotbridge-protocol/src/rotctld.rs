//! rotctld 文本命令协议
//!
//! 行协议：每条命令以 `\n` 结尾，守护进程对每条命令回复一段文本。
//!
//! | 命令 | 含义 | 应答 |
//! |------|------|------|
//! | `_` | 查询型号 | 型号文本 |
//! | `P az el` | 设置指向 | `RPRT 0` 或错误 |
//! | `p` | 查询指向 | 两行：方位角 / 俯仰角 |
//! | `S` | 停止 | `RPRT 0`（可选） |

use crate::{Position, ProtocolError, normalize_azimuth, parse_degrees};
use std::fmt;

/// 单次应答读取上限（字节）
pub const MAX_RESPONSE_LEN: usize = 1024;

/// 成功应答标记
pub const ACK_TOKEN: &str = "RPRT 0";

/// rotctld 命令
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotctldCommand {
    /// `_`：查询型号
    Identify,
    /// `P`：设置指向（调用方先用 [`Position::target`] 构造）
    SetPosition(Position),
    /// `p`：查询当前指向
    GetPosition,
    /// `S`：停止运动
    Stop,
}

impl RotctldCommand {
    /// 命令文本（不含换行）
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// 解析一行命令（服务端视角）
    ///
    /// 支持短格式（`P 10 20`）和长格式（`\set_pos 10 20`）。
    /// `P` 的参数原样保留，不做归一化。
    pub fn parse_line(line: &str) -> Result<Self, ProtocolError> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().ok_or(ProtocolError::EmptyResponse)?;

        match name {
            "_" | "\\get_info" => Ok(Self::Identify),
            "p" | "\\get_pos" => Ok(Self::GetPosition),
            "S" | "\\stop" => Ok(Self::Stop),
            "P" | "\\set_pos" => {
                let azimuth = tokens
                    .next()
                    .ok_or(ProtocolError::MissingField { field: "azimuth" })?;
                let elevation = tokens
                    .next()
                    .ok_or(ProtocolError::MissingField { field: "elevation" })?;
                Ok(Self::SetPosition(Position::new(
                    parse_degrees("azimuth", azimuth)?,
                    parse_degrees("elevation", elevation)?,
                )))
            },
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for RotctldCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identify => write!(f, "_"),
            Self::SetPosition(pos) => {
                write!(f, "P {:.1} {:.1}", wire_azimuth(pos.azimuth), pos.elevation)
            },
            Self::GetPosition => write!(f, "p"),
            Self::Stop => write!(f, "S"),
        }
    }
}

/// 按线上精度（0.1°）舍入后再取模
///
/// 例如 359.97 直接格式化会得到 `360.0`，这里折回 `0.0`。
fn wire_azimuth(azimuth: f64) -> f64 {
    normalize_azimuth((azimuth * 10.0).round() / 10.0)
}

/// 应答是否表示命令成功（包含 `RPRT 0`）
///
/// 子串匹配：`RPRT 0` 出现在应答的任意位置都视为成功。
pub fn is_ack(response: &str) -> bool {
    response.contains(ACK_TOKEN)
}

/// 解析 `p` 命令的应答
///
/// 前两行分别为方位角和俯仰角（十进制文本），其余行忽略。
/// 回报值原样返回，不做归一化。
pub fn parse_position_reply(response: &str) -> Result<Position, ProtocolError> {
    if response.trim().is_empty() {
        return Err(ProtocolError::EmptyResponse);
    }

    let mut lines = response.split('\n');
    let azimuth = lines
        .next()
        .ok_or(ProtocolError::MissingField { field: "azimuth" })?;
    let elevation = lines
        .next()
        .filter(|line| !line.trim().is_empty())
        .ok_or(ProtocolError::MissingField { field: "elevation" })?;

    Ok(Position::new(
        parse_degrees("azimuth", azimuth)?,
        parse_degrees("elevation", elevation)?,
    ))
}
