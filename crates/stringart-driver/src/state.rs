//! 共享状态
//!
//! 节拍线程每拍发布一次 [`MachineSnapshot`]（ArcSwap 无锁读取），
//! 执行器通过 [`CommandLabel`] 发布当前指令文本，供显示层读取。

use crate::hooks::SinkManager;
use crate::metrics::TickMetrics;
use crate::signal::AxisSignal;
use arc_swap::ArcSwap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use stringart_protocol::ToolId;

/// 运动轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// 摆臂（舵机）
    Arm,
    /// 转台（步进电机）
    Table,
}

impl From<ToolId> for Axis {
    fn from(tool: ToolId) -> Self {
        match tool {
            ToolId::Table => Axis::Table,
            ToolId::Arm => Axis::Arm,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Arm => f.write_str("arm"),
            Axis::Table => f.write_str("table"),
        }
    }
}

/// 每拍发布的机构状态
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MachineSnapshot {
    /// 节拍序号
    pub tick: u64,
    /// 摆臂角度（度）
    pub arm_angle: f64,
    /// 摆臂支点
    pub arm_origin: [f64; 2],
    /// 针长
    pub needle_length: f64,
    /// 转台角度（度，[0, 360)）
    pub table_angle: f64,
    /// 转台累计量化误差（度）
    pub table_error: f64,
    /// 转台已执行的有符号步数
    pub table_net_steps: i64,
    /// 转台中心
    pub table_origin: [f64; 2],
    /// 转台半径
    pub table_radius: f64,
    /// 钉子数量
    pub pin_count: u32,
    /// 摆臂是否在运动
    pub arm_moving: bool,
    /// 转台是否在运动
    pub table_moving: bool,
}

/// 当前指令文本（执行器唯一写入）
#[derive(Debug, Clone, Default)]
pub struct CommandLabel {
    inner: Arc<ArcSwap<String>>,
}

impl CommandLabel {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发布新的指令文本
    pub fn set(&self, label: impl Into<String>) {
        self.inner.store(Arc::new(label.into()));
    }

    /// 读取当前文本（无锁）
    pub fn get(&self) -> Arc<String> {
        self.inner.load_full()
    }
}

/// 节拍线程与控制方共享的上下文
pub struct MachineContext {
    /// 最新状态快照
    pub snapshot: ArcSwap<MachineSnapshot>,
    /// 当前指令文本
    pub command_label: CommandLabel,
    /// 摆臂命令邮箱
    pub arm_signal: AxisSignal,
    /// 转台命令邮箱
    pub table_signal: AxisSignal,
    /// 运动回调
    pub sinks: RwLock<SinkManager>,
    /// 性能指标
    pub metrics: TickMetrics,
}

impl MachineContext {
    pub fn new(initial: MachineSnapshot) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(initial),
            command_label: CommandLabel::new(),
            arm_signal: AxisSignal::new(),
            table_signal: AxisSignal::new(),
            sinks: RwLock::new(SinkManager::new()),
            metrics: TickMetrics::new(),
        }
    }

    /// 指定轴的命令邮箱
    pub fn signal(&self, axis: Axis) -> &AxisSignal {
        match axis {
            Axis::Arm => &self.arm_signal,
            Axis::Table => &self.table_signal,
        }
    }

    /// 读取最新快照
    pub fn snapshot(&self) -> MachineSnapshot {
        self.snapshot.load().as_ref().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_from_tool_id() {
        assert_eq!(Axis::from(ToolId::Arm), Axis::Arm);
        assert_eq!(Axis::from(ToolId::Table), Axis::Table);
        assert_eq!(Axis::Table.to_string(), "table");
    }

    #[test]
    fn test_command_label_shared_between_clones() {
        let label = CommandLabel::new();
        let reader = label.clone();
        assert_eq!(reader.get().as_str(), "");

        label.set("SP d100");
        assert_eq!(reader.get().as_str(), "SP d100");
    }

    #[test]
    fn test_context_signal_lookup() {
        let ctx = MachineContext::new(MachineSnapshot::default());
        ctx.signal(Axis::Table).submit(3.0);
        assert!(ctx.table_signal.is_busy());
        assert!(!ctx.arm_signal.is_busy());
    }
}
