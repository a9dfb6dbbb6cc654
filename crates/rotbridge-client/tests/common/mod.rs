//! 集成测试公共设施：进程内 rotctld 桩服务

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// 单连接 rotctld 桩
///
/// 每收到一行命令调用一次 `responder`，返回 `Some` 时写回应答，`None` 时不应答。
pub struct StubRotctld {
    pub port: u16,
    received: Arc<Mutex<Vec<String>>>,
    handle: Option<JoinHandle<()>>,
}

impl StubRotctld {
    pub fn spawn<F>(mut responder: F) -> Self
    where
        F: FnMut(&str) -> Option<String> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = received.clone();

        let handle = thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            let mut writer = stream.try_clone().unwrap();
            let reader = BufReader::new(stream);
            for line in reader.lines() {
                let Ok(line) = line else { break };
                log.lock().unwrap().push(line.clone());
                if let Some(reply) = responder(&line)
                    && writer.write_all(reply.as_bytes()).is_err()
                {
                    break;
                }
            }
        });

        Self {
            port,
            received,
            handle: Some(handle),
        }
    }

    /// 标准应答：型号 `Dummy`，`P` 回复 `set_reply`，`p` 回复固定位置
    pub fn standard(set_reply: &'static str, position: (f64, f64)) -> Self {
        Self::spawn(move |line| match line.chars().next() {
            Some('_') => Some("Dummy\n".to_string()),
            Some('P') => Some(set_reply.to_string()),
            Some('p') => Some(format!("{:.6}\n{:.6}\n", position.0, position.1)),
            Some('S') => Some("RPRT 0\n".to_string()),
            _ => Some("RPRT -4\n".to_string()),
        })
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    /// 等待连接关闭后的服务线程退出
    pub fn join(mut self) -> Vec<String> {
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
        self.received()
    }
}
