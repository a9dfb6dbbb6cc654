//! 时钟抽象
//!
//! 运动确认循环只通过 [`Clock`] 读取时间和休眠，测试中使用 [`SimulatedClock`]
//! 让超时判定完全确定（`sleep` 只推进虚拟时间，不真正阻塞）。

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// 单调时钟
pub trait Clock: Send {
    /// 自时钟创建以来经过的时间
    fn now(&self) -> Duration;

    /// 休眠指定时长
    fn sleep(&self, duration: Duration);
}

/// 系统单调时钟
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Default)]
struct SimulatedState {
    now: Duration,
    sleeps: usize,
}

/// 虚拟时钟
///
/// 克隆共享同一时间线：测试保留一个副本，把另一个交给客户端。
#[derive(Debug, Clone, Default)]
pub struct SimulatedClock {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 手动推进时间
    pub fn advance(&self, duration: Duration) {
        self.state().now += duration;
    }

    /// `sleep` 被调用的次数
    pub fn sleep_count(&self) -> usize {
        self.state().sleeps
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> Duration {
        self.state().now
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state();
        state.now += duration;
        state.sleeps += 1;
    }
}
