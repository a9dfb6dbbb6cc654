//! 桥接指标模块
//!
//! 原子计数器，监听线程与控制循环各自更新，任意线程读取快照。

use std::sync::atomic::{AtomicU64, Ordering};

/// 桥接实时指标
///
/// # 使用示例
///
/// ```rust
/// use rotbridge_driver::BridgeMetrics;
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
///
/// let metrics = Arc::new(BridgeMetrics::default());
/// metrics.datagrams_received.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.datagrams_received, 1);
/// ```
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    /// 收到的 UDP 数据报总数
    pub datagrams_received: AtomicU64,

    /// 套接字接收错误次数（不含读取超时）
    pub receive_errors: AtomicU64,

    /// 无法解析而丢弃的数据报数
    pub decode_failures: AtomicU64,

    /// 越界但仍转发的报告数
    pub out_of_range_reports: AtomicU64,

    /// 写入中继的目标数
    pub relay_published: AtomicU64,

    /// 中继覆盖次数（未被消费就被新值替换）
    pub relay_overwrites: AtomicU64,

    /// 下发给转台的运动命令数
    pub moves_commanded: AtomicU64,

    /// 失败的运动命令数
    pub moves_failed: AtomicU64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            out_of_range_reports: self.out_of_range_reports.load(Ordering::Relaxed),
            relay_published: self.relay_published.load(Ordering::Relaxed),
            relay_overwrites: self.relay_overwrites.load(Ordering::Relaxed),
            moves_commanded: self.moves_commanded.load(Ordering::Relaxed),
            moves_failed: self.moves_failed.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub datagrams_received: u64,
    pub receive_errors: u64,
    pub decode_failures: u64,
    pub out_of_range_reports: u64,
    pub relay_published: u64,
    pub relay_overwrites: u64,
    pub moves_commanded: u64,
    pub moves_failed: u64,
}

impl MetricsSnapshot {
    /// 中继覆盖率（百分比），无写入时为 0
    pub fn overwrite_rate(&self) -> f64 {
        if self.relay_published == 0 {
            return 0.0;
        }
        (self.relay_overwrites as f64 / self.relay_published as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_default() {
        let snapshot = BridgeMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
        assert_eq!(snapshot.overwrite_rate(), 0.0);
    }

    #[test]
    fn test_overwrite_rate() {
        let metrics = BridgeMetrics::new();
        metrics.relay_published.fetch_add(4, Ordering::Relaxed);
        metrics.relay_overwrites.fetch_add(1, Ordering::Relaxed);
        assert_eq!(metrics.snapshot().overwrite_rate(), 25.0);
    }

    #[test]
    fn test_metrics_concurrent_increment() {
        let metrics = Arc::new(BridgeMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.datagrams_received.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().datagrams_received, 4000);
    }
}
