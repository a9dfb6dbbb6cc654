//! 驱动层错误类型定义

use rotbridge_client::RotatorError;
use rotbridge_link::LinkError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 链路错误（UDP 绑定失败等）
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// 阻塞运动失败，控制循环终止
    #[error("Movement failed: {0}")]
    Movement(#[source] RotatorError),

    /// 锁被毒化（线程 panic）
    #[error("Poisoned lock (thread panic)")]
    PoisonedLock,

    /// 监听线程错误
    #[error("Listener thread error: {0}")]
    ListenerThread(String),
}

impl DriverError {
    /// 运动失败是否意味着转台会话已不可用
    pub fn is_fatal(&self) -> bool {
        match self {
            DriverError::Movement(e) => e.is_fatal(),
            _ => true,
        }
    }
}
