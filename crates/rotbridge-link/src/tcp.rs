//! rotctld TCP 链路

use crate::{LineLink, LinkError};
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// 到 rotctld 的 TCP 连接
///
/// 连接超时与读写超时使用同一个值。关闭后所有操作返回 [`LinkError::Closed`]。
pub struct TcpLink {
    stream: Option<TcpStream>,
    peer: SocketAddr,
}

impl TcpLink {
    /// 解析 `host:port` 并依次尝试每个地址，直到连接成功
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, LinkError> {
        let target = format!("{}:{}", host, port);
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|_| LinkError::Resolve(target.clone()))?
            .collect();
        if addrs.is_empty() {
            return Err(LinkError::Resolve(target));
        }

        let mut last_error = None;
        for addr in addrs {
            debug!("Connecting to rotctld at {}", addr);
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Self::from_stream(stream, timeout),
                Err(e) => {
                    warn!("Connection attempt to {} failed: {}", addr, e);
                    last_error = Some(e);
                },
            }
        }

        Err(LinkError::Connect {
            addr: target,
            source: last_error.unwrap_or_else(|| std::io::ErrorKind::NotConnected.into()),
        })
    }

    /// 包装已连接的流（设置读写超时并关闭 Nagle）
    pub fn from_stream(stream: TcpStream, timeout: Duration) -> Result<Self, LinkError> {
        let peer = stream.peer_addr()?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream: Some(stream),
            peer,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn stream(&mut self) -> Result<&mut TcpStream, LinkError> {
        self.stream.as_mut().ok_or(LinkError::Closed)
    }
}

impl LineLink for TcpLink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        trace!("TX {:?}", String::from_utf8_lossy(bytes));
        let stream = self.stream()?;
        stream.write_all(bytes).map_err(LinkError::from_io)?;
        stream.flush().map_err(LinkError::from_io)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let stream = self.stream()?;
        match stream.read(buf) {
            Ok(0) => Err(LinkError::Closed),
            Ok(n) => {
                trace!("RX {:?}", String::from_utf8_lossy(&buf[..n]));
                Ok(n)
            },
            Err(e) => Err(LinkError::from_io(e)),
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!("Closing rotctld connection to {}", self.peer);
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_connect_send_receive() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 64];
            let n = conn.read(&mut buf).unwrap();
            assert_eq!(&buf[..n], b"_\n");
            conn.write_all(b"Dummy\n").unwrap();
        });

        let mut link = TcpLink::connect("127.0.0.1", port, Duration::from_secs(2)).unwrap();
        assert!(link.is_open());
        link.send(b"_\n").unwrap();

        let mut buf = [0u8; 64];
        let n = link.receive(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"Dummy\n");
        server.join().unwrap();
    }

    #[test]
    fn test_receive_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (conn, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(300));
            drop(conn);
        });

        let mut link = TcpLink::connect("127.0.0.1", port, Duration::from_millis(50)).unwrap();
        let mut buf = [0u8; 16];
        assert!(matches!(link.receive(&mut buf), Err(LinkError::Timeout)));
        server.join().unwrap();
    }

    #[test]
    fn test_peer_close_is_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (conn, _) = listener.accept().unwrap();
            drop(conn);
        });

        let mut link = TcpLink::connect("127.0.0.1", port, Duration::from_secs(2)).unwrap();
        server.join().unwrap();
        let mut buf = [0u8; 16];
        assert!(matches!(link.receive(&mut buf), Err(LinkError::Closed)));
    }

    #[test]
    fn test_operations_after_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut link = TcpLink::connect("127.0.0.1", port, Duration::from_secs(2)).unwrap();
        link.close();
        link.close();
        assert!(!link.is_open());
        assert!(matches!(link.send(b"p\n"), Err(LinkError::Closed)));
        let mut buf = [0u8; 16];
        assert!(matches!(link.receive(&mut buf), Err(LinkError::Closed)));
        drop(listener);
    }

    #[test]
    fn test_connect_refused() {
        // 绑定后立即释放，端口大概率无人监听
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let result = TcpLink::connect("127.0.0.1", port, Duration::from_millis(500));
        assert!(matches!(result, Err(LinkError::Connect { .. })));
    }
}
