//! 最新值中继（邮箱模式：Last Write Wins）
//!
//! 单槽 `Mutex<Option<T>>`：写端覆盖，读端取走。转台阻塞运动期间到达的多个目标
//! 只保留最后一个，避免过时目标排队。值在锁内整体替换，不会读到半写状态。

use crate::error::DriverError;
use crate::metrics::BridgeMetrics;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tracing::{error, trace};

/// 中继槽
pub struct LatestValueRelay<T> {
    slot: Arc<Mutex<Option<T>>>,
    metrics: Arc<BridgeMetrics>,
}

impl<T> LatestValueRelay<T> {
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(BridgeMetrics::new()))
    }

    pub fn with_metrics(metrics: Arc<BridgeMetrics>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            metrics,
        }
    }

    /// 拆分为写端和读端
    pub fn split(self) -> (RelaySender<T>, RelayReceiver<T>) {
        (
            RelaySender {
                slot: self.slot.clone(),
                metrics: self.metrics.clone(),
            },
            RelayReceiver {
                slot: self.slot,
            },
        )
    }
}

impl<T> Default for LatestValueRelay<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 写端（可克隆）
pub struct RelaySender<T> {
    slot: Arc<Mutex<Option<T>>>,
    metrics: Arc<BridgeMetrics>,
}

impl<T> Clone for RelaySender<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<T> RelaySender<T> {
    /// 写入新值，覆盖未被取走的旧值
    ///
    /// 返回是否发生了覆盖。
    pub fn publish(&self, value: T) -> Result<bool, DriverError> {
        match self.slot.lock() {
            Ok(mut slot) => {
                let is_overwrite = slot.replace(value).is_some();
                drop(slot);

                self.metrics.relay_published.fetch_add(1, Ordering::Relaxed);
                if is_overwrite {
                    self.metrics.relay_overwrites.fetch_add(1, Ordering::Relaxed);
                    trace!("Relay slot overwritten before it was consumed");
                }
                Ok(is_overwrite)
            },
            Err(_) => {
                error!("Relay slot lock poisoned, consumer may have panicked");
                Err(DriverError::PoisonedLock)
            },
        }
    }
}

/// 读端
pub struct RelayReceiver<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> RelayReceiver<T> {
    /// 取走最新值（没有新值时返回 `None`）
    pub fn take_latest(&self) -> Result<Option<T>, DriverError> {
        match self.slot.lock() {
            Ok(mut slot) => Ok(slot.take()),
            Err(_) => {
                error!("Relay slot lock poisoned, producer may have panicked");
                Err(DriverError::PoisonedLock)
            },
        }
    }
}
