//! 节拍循环性能指标（原子计数器）

use std::sync::atomic::{AtomicU64, Ordering};

/// 节拍循环计数器
///
/// 全部使用 `Relaxed`，只用于监控。
#[derive(Debug, Default)]
pub struct TickMetrics {
    /// 已执行的节拍数
    pub ticks: AtomicU64,
    /// 超时（错过节拍期限）次数
    pub overruns: AtomicU64,
    /// 已接收的命令数
    pub commands: AtomicU64,
    /// 摆臂已执行的增量数
    pub arm_increments: AtomicU64,
    /// 转台已执行的步数
    pub table_steps: AtomicU64,
}

/// 计数器快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickMetricsSnapshot {
    pub ticks: u64,
    pub overruns: u64,
    pub commands: u64,
    pub arm_increments: u64,
    pub table_steps: u64,
}

impl TickMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取当前计数
    pub fn snapshot(&self) -> TickMetricsSnapshot {
        TickMetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            commands: self.commands.load(Ordering::Relaxed),
            arm_increments: self.arm_increments.load(Ordering::Relaxed),
            table_steps: self.table_steps.load(Ordering::Relaxed),
        }
    }
}
