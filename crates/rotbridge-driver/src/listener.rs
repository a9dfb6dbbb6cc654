//! MacDoppler 广播监听线程
//!
//! 套接字在调用线程上绑定（绑定失败同步返回），接收循环在后台线程运行。
//! 读取超时 1 秒，用于周期性检查停止标志。
//! 接收出错时按指数退避等待（100ms 起，上限 1s），成功收到数据后复位。

use crate::error::DriverError;
use crate::metrics::BridgeMetrics;
use rotbridge_link::BroadcastSocket;
use rotbridge_protocol::macdoppler::{self, MAX_DATAGRAM_LEN, PointingReport};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 首次接收错误后的等待时间
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// 连续接收错误的最长等待时间
const MAX_RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// 连续错误达到该次数后升级为 error 日志
const RECEIVE_ERROR_ESCALATION: u32 = 10;

/// 监听参数
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerConfig {
    /// 绑定地址（默认 `0.0.0.0:9932`）
    pub bind_addr: SocketAddr,
    /// 单次接收的最长阻塞时间
    pub read_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::UNSPECIFIED,
                macdoppler::DEFAULT_PORT,
            )),
            read_timeout: Duration::from_secs(1),
        }
    }
}

impl ListenerConfig {
    pub fn with_port(port: u16) -> Self {
        let mut config = Self::default();
        config.bind_addr.set_port(port);
        config
    }
}

/// 广播监听器
///
/// 每条成功解析的报告都会在监听线程上同步交给回调。
/// `stop()` 或 drop 时通知线程退出并等待其结束。
pub struct PositionListener {
    local_addr: SocketAddr,
    is_running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PositionListener {
    pub fn spawn<F>(
        config: &ListenerConfig,
        metrics: Arc<BridgeMetrics>,
        mut callback: F,
    ) -> Result<Self, DriverError>
    where
        F: FnMut(PointingReport) + Send + 'static,
    {
        let socket = BroadcastSocket::bind(config.bind_addr, config.read_timeout)?;
        let local_addr = socket.local_addr()?;
        let is_running = Arc::new(AtomicBool::new(true));
        let running = is_running.clone();

        let thread = thread::Builder::new()
            .name("macdoppler-listener".into())
            .spawn(move || {
                info!("Started MacDoppler listener on {}", local_addr);
                let mut buf = [0u8; MAX_DATAGRAM_LEN];
                let mut backoff = ReceiveBackoff::default();
                while running.load(Ordering::Acquire) {
                    match socket.recv(&mut buf) {
                        Ok(Some((n, from))) => {
                            backoff.reset();
                            metrics.datagrams_received.fetch_add(1, Ordering::Relaxed);
                            let packet = String::from_utf8_lossy(&buf[..n]);
                            debug!("MacDoppler datagram from {}: {:?}", from, packet);
                            if let Some(report) = decode(&packet, &metrics) {
                                callback(report);
                            }
                        },
                        Ok(None) => {},
                        Err(e) => {
                            metrics.receive_errors.fetch_add(1, Ordering::Relaxed);
                            let delay = backoff.on_error();
                            if backoff.consecutive() >= RECEIVE_ERROR_ESCALATION {
                                error!(
                                    "MacDoppler listener receive error ({} in a row): {}",
                                    backoff.consecutive(),
                                    e
                                );
                            } else {
                                warn!("MacDoppler listener receive error: {}", e);
                            }
                            thread::sleep(delay);
                        },
                    }
                }
                info!("Closed MacDoppler listener");
            })
            .map_err(|e| DriverError::ListenerThread(e.to_string()))?;

        Ok(Self {
            local_addr,
            is_running,
            thread: Some(thread),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// 停止并等待线程退出（幂等）
    pub fn stop(&mut self) {
        self.is_running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            error!("MacDoppler listener thread panicked");
        }
    }
}

impl Drop for PositionListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 接收错误退避：连续出错时等待时间翻倍
#[derive(Debug, Default)]
struct ReceiveBackoff {
    consecutive: u32,
}

impl ReceiveBackoff {
    /// 记录一次错误，返回本次应等待的时间
    fn on_error(&mut self) -> Duration {
        self.consecutive = self.consecutive.saturating_add(1);
        let doublings = (self.consecutive - 1).min(4);
        RECEIVE_ERROR_BACKOFF
            .saturating_mul(1 << doublings)
            .min(MAX_RECEIVE_ERROR_BACKOFF)
    }

    fn reset(&mut self) {
        self.consecutive = 0;
    }

    fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

/// 解析报文；失败时记录并丢弃，越界值记录后照常返回
fn decode(packet: &str, metrics: &BridgeMetrics) -> Option<PointingReport> {
    let report = match macdoppler::parse_packet(packet.trim_end_matches('\0')) {
        Ok(report) => report,
        Err(e) => {
            metrics.decode_failures.fetch_add(1, Ordering::Relaxed);
            error!("Exception parsing UDP packet: {} ({:?})", e, packet);
            return None;
        },
    };

    let mut out_of_range = false;
    if !report.azimuth_in_range() {
        error!("Got invalid azimuth: {}", report.azimuth);
        out_of_range = true;
    }
    if !report.elevation_in_range() {
        error!("Got invalid elevation: {}", report.elevation);
        out_of_range = true;
    }
    if out_of_range {
        metrics.out_of_range_reports.fetch_add(1, Ordering::Relaxed);
    }
    Some(report)
}
