//! 运动回调系统
//!
//! 节拍线程在轴移动时触发 [`MotionCallback`]，用于显示、录制等用途。
//!
//! # 使用示例
//!
//! ```rust
//! use stringart_driver::hooks::{MotionCallback, SinkManager};
//! use stringart_driver::recording::RecordingSink;
//! use std::sync::Arc;
//!
//! let mut sinks = SinkManager::new();
//! let (sink, rx) = RecordingSink::new();
//! sinks.add_callback(Arc::new(sink));
//!
//! // 在节拍线程中触发
//! sinks.trigger_arm_moved(1, 12.5);
//! assert!(rx.try_recv().is_ok());
//! ```

use crate::motion::Direction;
use crate::state::Axis;
use std::sync::Arc;

/// 运动回调 Trait
///
/// 回调在节拍线程中执行，必须非阻塞（推荐 `try_send` 转发到其他线程）。
pub trait MotionCallback: Send + Sync {
    /// 摆臂移动一拍后调用
    fn on_arm_moved(&self, tick: u64, angle: f64);

    /// 转台走一步后调用
    fn on_table_step(&self, tick: u64, direction: Direction, angle: f64);

    /// 轴任务结束时调用（可选）
    fn on_motion_complete(&self, tick: u64, axis: Axis) {
        let _ = (tick, axis);
    }
}

/// 回调管理器
///
/// 列表本身不是线程安全的，由 `MachineContext` 中的 `RwLock` 保护。
#[derive(Default)]
pub struct SinkManager {
    callbacks: Vec<Arc<dyn MotionCallback>>,
}

impl SinkManager {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// 添加回调
    pub fn add_callback(&mut self, callback: Arc<dyn MotionCallback>) {
        self.callbacks.push(callback);
    }

    /// 移除所有回调
    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    pub fn trigger_arm_moved(&self, tick: u64, angle: f64) {
        for callback in self.callbacks.iter() {
            callback.on_arm_moved(tick, angle);
        }
    }

    pub fn trigger_table_step(&self, tick: u64, direction: Direction, angle: f64) {
        for callback in self.callbacks.iter() {
            callback.on_table_step(tick, direction, angle);
        }
    }

    pub fn trigger_motion_complete(&self, tick: u64, axis: Axis) {
        for callback in self.callbacks.iter() {
            callback.on_motion_complete(tick, axis);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}
