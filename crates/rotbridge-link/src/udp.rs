//! UDP 广播接收套接字
//!
//! 多个监听者可以同时绑定同一端口（`SO_REUSEADDR`，unix 下另设 `SO_REUSEPORT`），
//! 并允许接收广播报文（`SO_BROADCAST`）。

use crate::LinkError;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;
use tracing::debug;

/// 已绑定的广播接收套接字
pub struct BroadcastSocket {
    socket: UdpSocket,
}

impl BroadcastSocket {
    /// 绑定到 `addr`
    ///
    /// `read_timeout` 决定 [`BroadcastSocket::recv`] 的最长阻塞时间，
    /// 监听线程依靠它周期性检查停止标志。
    pub fn bind(addr: SocketAddr, read_timeout: Duration) -> Result<Self, LinkError> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos", target_os = "cygwin"))))]
        socket.set_reuse_port(true)?;
        socket.set_broadcast(true)?;
        socket.set_read_timeout(Some(read_timeout))?;
        socket.bind(&SockAddr::from(addr))?;

        let socket: UdpSocket = socket.into();
        debug!("UDP broadcast socket bound to {}", socket.local_addr()?);
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, LinkError> {
        Ok(self.socket.local_addr()?)
    }

    /// 接收一个数据报
    ///
    /// 超时返回 `Ok(None)`，其余错误原样返回。
    pub fn recv(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, LinkError> {
        match self.socket.recv_from(buf) {
            Ok(received) => Ok(Some(received)),
            Err(e) => match LinkError::from_io(e) {
                LinkError::Timeout => Ok(None),
                other => Err(other),
            },
        }
    }
}
