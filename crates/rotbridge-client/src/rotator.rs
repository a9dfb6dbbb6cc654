//! rotctld 会话客户端
//!
//! 严格同步：每条命令写出后执行一次读取，同一会话任意时刻最多一个请求在途。
//! 所有方法都需要 `&mut self`，并发使用在编译期即被排除。

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::error::{Result, RotatorError};
use crate::motion::{MoveAndConfirm, RotatorIo};
use crate::types::{MoveMode, MoveOutcome};
use rotbridge_link::{LineLink, LinkError, TcpLink};
use rotbridge_protocol::rotctld::MAX_RESPONSE_LEN;
use rotbridge_protocol::{HamlibStatus, Position, RotctldCommand, parse_position_reply};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// rotctld 客户端
///
/// # 示例
///
/// ```rust,no_run
/// use rotbridge_client::{MoveMode, RotatorClient, SessionConfig};
///
/// let config = SessionConfig::default();
/// let mut rotator = RotatorClient::connect(&config)?;
/// println!("model: {}", rotator.model());
///
/// let outcome = rotator.command_position(180.0, 45.0, MoveMode::Blocking);
/// println!("{:?}", outcome);
/// # Ok::<(), rotbridge_client::RotatorError>(())
/// ```
pub struct RotatorClient<L: LineLink = TcpLink, C: Clock = SystemClock> {
    link: L,
    clock: C,
    config: SessionConfig,
    model: String,
}

impl RotatorClient<TcpLink, SystemClock> {
    /// 连接 rotctld 并完成型号握手
    ///
    /// - 地址解析失败 / 连接被拒绝：[`RotatorError::Link`]
    /// - 握手无应答（超时、断开或空应答）：关闭连接并返回 [`RotatorError::ConnectTimeout`]
    /// - 握手得到 `RPRT` 状态而非型号：关闭连接并返回 [`RotatorError::ProtocolError`]
    pub fn connect(config: &SessionConfig) -> Result<Self> {
        config.validate()?;
        let link = TcpLink::connect(&config.host, config.port, config.timeout)?;
        info!("Connected to rotctld at {}", link.peer_addr());
        Self::with_link(link, SystemClock::new(), config.clone())
    }
}

impl<L: LineLink, C: Clock> RotatorClient<L, C> {
    /// 在已建立的链路上完成握手
    pub fn with_link(link: L, clock: C, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let mut client = Self {
            link,
            clock,
            config,
            model: String::new(),
        };

        match client.identify() {
            Ok(model) if !model.is_empty() => {
                info!("rotctld model: {}", model);
                client.model = model;
                Ok(client)
            },
            Ok(_) => {
                error!("rotctld returned an empty identify response");
                client.close();
                Err(RotatorError::ConnectTimeout)
            },
            Err(e @ RotatorError::ProtocolError { .. }) => {
                error!("rotctld refused the identify handshake: {}", e);
                client.close();
                Err(e)
            },
            Err(e) => {
                error!("rotctld identify handshake failed: {}", e);
                client.close();
                Err(RotatorError::ConnectTimeout)
            },
        }
    }

    /// 握手时得到的型号
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_open()
    }

    /// 发送一条原始命令（自动追加 `\n`）并读取一次应答
    pub fn send_command(&mut self, text: &str) -> Result<String> {
        self.write_line(text)?;
        self.read_response()
    }

    /// 查询型号（`_`），返回去除首尾空白的文本
    ///
    /// 应答为 `RPRT` 状态行时返回 [`RotatorError::ProtocolError`]。
    pub fn identify(&mut self) -> Result<String> {
        let response = self.send_command(&RotctldCommand::Identify.encode())?;
        if HamlibStatus::find_in(&response).is_some() {
            return Err(RotatorError::ProtocolError { response });
        }
        Ok(response.trim().to_string())
    }

    /// 查询当前位置（`p`），失败时记录日志并返回 `None`
    pub fn query_position(&mut self) -> Option<Position> {
        match self.try_query_position() {
            Ok(position) => Some(position),
            Err(e) => {
                error!("Could not get rotator position: {}", e);
                None
            },
        }
    }

    /// 查询当前位置，保留失败原因
    ///
    /// 守护进程以错误状态（如 `RPRT -5`）代替位置时返回 [`RotatorError::ProtocolError`]，
    /// 其余无法解析的应答为 [`RotatorError::ParseFailure`]。
    pub fn try_query_position(&mut self) -> Result<Position> {
        let response = self.send_command(&RotctldCommand::GetPosition.encode())?;
        if HamlibStatus::find_in(&response).is_some_and(|status| !status.is_ok()) {
            return Err(RotatorError::ProtocolError { response });
        }
        parse_position_reply(&response).map_err(|e| {
            debug!("Unparsable position response {:?}", response);
            RotatorError::ParseFailure(e)
        })
    }

    /// 设置指向
    ///
    /// 方位角归一化到 `[0, 360)`，俯仰角钳位到 `[0, 90]`，舍入到 0.1° 后发送。
    /// NaN / 无穷大不发送任何命令，直接返回 [`MoveOutcome::InvalidTarget`]。
    /// 阻塞模式下轮询位置直到到达、超时或遥测丢失。
    pub fn command_position(&mut self, azimuth: f64, elevation: f64, mode: MoveMode) -> MoveOutcome {
        let target = match Position::target(azimuth, elevation) {
            Ok(target) => target,
            Err(e) => {
                warn!("Refusing target ({}, {}): {}", azimuth, elevation, e);
                return MoveOutcome::InvalidTarget(e);
            },
        };
        if target.azimuth != azimuth || target.elevation != elevation {
            debug!(
                "Target ({:.2}, {:.2}) normalized to {}",
                azimuth, elevation, target
            );
        }
        MoveAndConfirm::new(target, mode, &self.config).run(self)
    }

    /// 停止运动（`S`）
    ///
    /// 写入失败只记录日志。随后以会话超时读取一次，丢弃可能的 `RPRT` 应答，
    /// 保持后续请求与应答对齐。
    pub fn halt(&mut self) {
        if let Err(e) = self.write_line(&RotctldCommand::Stop.encode()) {
            warn!("Failed to send halt command: {}", e);
            return;
        }
        match self.read_response() {
            Ok(response) => trace!("Halt response: {:?}", response.trim()),
            Err(e) => trace!("No halt response: {}", e),
        }
    }

    /// 关闭会话（幂等）
    pub fn close(&mut self) {
        if self.link.is_open() {
            debug!("Closing rotctld session");
            self.link.close();
        }
    }

    fn write_line(&mut self, text: &str) -> Result<()> {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        debug!("rotctld TX {:?}", text);
        self.link.send(line.as_bytes()).map_err(link_failure)
    }

    fn read_response(&mut self) -> Result<String> {
        let mut buf = [0u8; MAX_RESPONSE_LEN];
        let n = self.link.receive(&mut buf).map_err(link_failure)?;
        let response = String::from_utf8_lossy(&buf[..n]).into_owned();
        debug!("rotctld RX {:?}", response);
        Ok(response)
    }
}

/// 链路错误映射到会话语义：读超时为 `Timeout`，其余均视为连接中断
fn link_failure(error: LinkError) -> RotatorError {
    match error {
        LinkError::Timeout => RotatorError::Timeout,
        LinkError::Closed => RotatorError::ConnectionLost("connection closed".into()),
        other => RotatorError::ConnectionLost(other.to_string()),
    }
}

impl<L: LineLink, C: Clock> RotatorIo for RotatorClient<L, C> {
    fn transmit(&mut self, command: &RotctldCommand) -> Result<()> {
        self.write_line(&command.encode())
    }

    fn await_reply(&mut self) -> Result<String> {
        self.read_response()
    }

    fn poll_position(&mut self) -> Option<Position> {
        self.query_position()
    }

    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn sleep(&mut self, duration: Duration) {
        self.clock.sleep(duration);
    }
}

impl<L: LineLink, C: Clock> Drop for RotatorClient<L, C> {
    fn drop(&mut self) {
        self.close();
    }
}
