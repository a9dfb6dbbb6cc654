//! # rotbridge Link Layer
//!
//! 传输抽象层：为 rotctld 会话提供统一的字节流接口，为 MacDoppler 广播提供 UDP 接收。
//!
//! - [`TcpLink`]: rotctld TCP 连接（连接超时 + 读写超时）
//! - [`BroadcastSocket`]: UDP 广播接收（`SO_REUSEADDR` / `SO_REUSEPORT` / `SO_BROADCAST`）
//! - `MockLink`: 脚本化应答（`mock` feature，单元测试使用）

use std::io;
use thiserror::Error;

pub mod tcp;
pub mod udp;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use tcp::TcpLink;
pub use udp::BroadcastSocket;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockHandle, MockLink, MockReply};

/// 链路层统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to resolve address {0}")]
    Resolve(String),
    #[error("Connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("Read timeout")]
    Timeout,
    #[error("Connection closed")]
    Closed,
}

impl LinkError {
    /// 将 IO 错误归类：超时类错误映射为 [`LinkError::Timeout`]
    pub fn from_io(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => LinkError::Timeout,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => LinkError::Closed,
            _ => LinkError::Io(error),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LinkError::Timeout)
    }
}

/// 请求/应答式字节链路
///
/// 一次 `send` 写出完整命令，一次 `receive` 执行**一次**阻塞读取。
/// 读取到 0 字节表示对端关闭，实现必须返回 [`LinkError::Closed`]。
pub trait LineLink {
    /// 写出全部字节
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// 单次读取，返回读到的字节数（> 0）
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;

    /// 关闭链路（幂等）
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

impl<L: LineLink + ?Sized> LineLink for Box<L> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        (**self).send(bytes)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        (**self).receive(buf)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_classification() {
        assert!(LinkError::from_io(io::Error::from(io::ErrorKind::WouldBlock)).is_timeout());
        assert!(LinkError::from_io(io::Error::from(io::ErrorKind::TimedOut)).is_timeout());
        assert!(matches!(
            LinkError::from_io(io::Error::from(io::ErrorKind::ConnectionReset)),
            LinkError::Closed
        ));
        assert!(matches!(
            LinkError::from_io(io::Error::from(io::ErrorKind::PermissionDenied)),
            LinkError::Io(_)
        ));
    }

    #[test]
    fn test_boxed_link_delegates() {
        let (link, handle) = MockLink::new();
        let mut boxed: Box<dyn LineLink> = Box::new(link);
        handle.push_reply(MockReply::text("RPRT 0\n"));

        boxed.send(b"S\n").unwrap();
        let mut buf = [0u8; 16];
        let n = boxed.receive(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"RPRT 0\n");
        assert_eq!(handle.sent_lines(), vec!["S".to_string()]);

        boxed.close();
        assert!(!boxed.is_open());
    }
}
