//! 脚本化 Mock 链路
//!
//! 应答按顺序出队：每次 `receive` 取出一条预置应答，队列为空时返回超时。
//! [`MockHandle`] 与链路共享状态，链路被上层接管后仍可追加应答、检查已发送命令。

use crate::{LineLink, LinkError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// 预置应答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// 返回一段数据
    Data(Vec<u8>),
    /// 读取超时
    Timeout,
    /// 对端关闭（0 字节）
    Closed,
}

impl MockReply {
    pub fn text(text: &str) -> Self {
        MockReply::Data(text.as_bytes().to_vec())
    }
}

#[derive(Default)]
struct MockState {
    replies: VecDeque<MockReply>,
    sent: Vec<Vec<u8>>,
    open: bool,
    fail_send: bool,
}

/// Mock 链路
pub struct MockLink {
    state: Arc<Mutex<MockState>>,
}

/// 测试侧句柄
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

fn lock(state: &Arc<Mutex<MockState>>) -> MutexGuard<'_, MockState> {
    // 测试断言失败导致的中毒不影响后续检查
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockLink {
    pub fn new() -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState {
            open: true,
            ..Default::default()
        }));
        (
            Self {
                state: state.clone(),
            },
            MockHandle { state },
        )
    }
}

impl MockHandle {
    pub fn push_reply(&self, reply: MockReply) {
        lock(&self.state).replies.push_back(reply);
    }

    pub fn push_text(&self, text: &str) {
        self.push_reply(MockReply::text(text));
    }

    /// 已发送命令（去掉结尾换行）
    pub fn sent_lines(&self) -> Vec<String> {
        lock(&self.state)
            .sent
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).trim_end_matches('\n').to_string())
            .collect()
    }

    /// 尚未消费的应答数
    pub fn pending_replies(&self) -> usize {
        lock(&self.state).replies.len()
    }

    /// 之后的 `send` 全部失败
    pub fn fail_sends(&self) {
        lock(&self.state).fail_send = true;
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).open
    }
}

impl LineLink for MockLink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let mut state = lock(&self.state);
        if !state.open {
            return Err(LinkError::Closed);
        }
        if state.fail_send {
            return Err(LinkError::Io(std::io::ErrorKind::BrokenPipe.into()));
        }
        state.sent.push(bytes.to_vec());
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let mut state = lock(&self.state);
        if !state.open {
            return Err(LinkError::Closed);
        }
        match state.replies.pop_front() {
            Some(MockReply::Data(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n == 0 {
                    Err(LinkError::Closed)
                } else {
                    Ok(n)
                }
            },
            Some(MockReply::Closed) => Err(LinkError::Closed),
            Some(MockReply::Timeout) | None => Err(LinkError::Timeout),
        }
    }

    fn close(&mut self) {
        lock(&self.state).open = false;
    }

    fn is_open(&self) -> bool {
        lock(&self.state).open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replies_in_order() {
        let (mut link, handle) = MockLink::new();
        handle.push_text("first\n");
        handle.push_reply(MockReply::Closed);

        let mut buf = [0u8; 32];
        let n = link.receive(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"first\n");
        assert!(matches!(link.receive(&mut buf), Err(LinkError::Closed)));
        assert!(matches!(link.receive(&mut buf), Err(LinkError::Timeout)));
        assert_eq!(handle.pending_replies(), 0);
    }

    #[test]
    fn test_closed_link_rejects_io() {
        let (mut link, handle) = MockLink::new();
        link.close();
        assert!(!handle.is_open());
        assert!(matches!(link.send(b"p\n"), Err(LinkError::Closed)));
    }

    #[test]
    fn test_fail_sends() {
        let (mut link, handle) = MockLink::new();
        handle.fail_sends();
        assert!(matches!(link.send(b"S\n"), Err(LinkError::Io(_))));
        assert!(handle.sent_lines().is_empty());
    }
}
